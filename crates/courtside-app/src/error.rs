//! Error types for Courtside app services
//!
//! Application-level errors that wrap engine errors and add app-specific variants.

use courtside::error::EngineError;
use thiserror::Error;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Engine(EngineError::Io(e))
    }
}

/// Result type alias for Courtside app services
pub type Result<T> = std::result::Result<T, AppError>;
