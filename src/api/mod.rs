// src/api/mod.rs

pub mod extract;
pub mod handlers;
pub mod middleware; // Authentication extractors and rate limiting
pub mod server;
pub mod server_config; // Server limits
pub mod state;
pub mod types;

pub use server::ApiServer;
pub use state::AppState;
pub use types::{ApiResponse, Pagination};
