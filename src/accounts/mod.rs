pub mod dto;
pub mod password;
pub mod repo_types;
pub mod services;
