pub mod accounts;
pub mod chat;
pub mod config;
pub mod error;
pub mod products;
pub mod state;
pub mod store;

pub use state::{AppState, Session};
