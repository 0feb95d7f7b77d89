//! Cross-cutting pieces: configuration, the error type and field validators.

pub mod config;
pub mod errors;
pub mod validation;

pub use config::{AppConfig, ConfigError};
pub use errors::AppError;

pub type AppResult<T> = Result<T, AppError>;
