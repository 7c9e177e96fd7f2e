pub mod codes;
mod error;
pub mod repo_types;
pub mod reviews;
pub mod services;

pub use error::ProductError;
