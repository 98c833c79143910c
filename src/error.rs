//! Application-wide error types.
//!
//! Each area has its own error enum; `AppError` wraps them for the binary
//! and the application context.

pub use crate::api::ApiError;
pub use crate::config::ConfigError;
pub use crate::storage::StorageError;

/// Main application error type.
///
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Persistent storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Simulated backend errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Logger initialization errors
    #[error("Logger error: {0}")]
    Logger(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
