//! Error types for the Courtside engine
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Main error type for the playback engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("{}", friendly_io_error(.0))]
    Io(#[from] std::io::Error),

    #[error("Timeout: {0}")]
    Timeout(String),
}

/// Result type alias for the engine
pub type Result<T> = std::result::Result<T, EngineError>;

fn friendly_io_error(e: &std::io::Error) -> String {
    match e.kind() {
        std::io::ErrorKind::NotFound => "Audio file not found".to_string(),
        std::io::ErrorKind::PermissionDenied => "Permission denied reading audio file".to_string(),
        _ => format!("I/O error: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_message_is_readable() {
        let err = EngineError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.to_string(), "Audio file not found");
    }

    #[test]
    fn other_io_errors_keep_detail() {
        let err = EngineError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk melted"));
        assert!(err.to_string().contains("disk melted"));
    }
}
