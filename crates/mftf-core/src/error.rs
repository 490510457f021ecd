//! Unified error types for mftf

use thiserror::Error;

/// Unified error type for all mftf operations
#[derive(Error, Debug)]
pub enum MftfError {
    // Browser session errors
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Element not found: {locator}")]
    ElementNotFound { locator: String },

    #[error("More than one element ({count}) matches locator {locator}")]
    AmbiguousLocator { locator: String, count: usize },

    // Backend bridge errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

/// Result type alias using MftfError
pub type Result<T> = std::result::Result<T, MftfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_locator_message() {
        let err = MftfError::AmbiguousLocator {
            locator: "//div[@id='grid']".to_string(),
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "More than one element (2) matches locator //div[@id='grid']"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MftfError = io.into();
        assert!(matches!(err, MftfError::Io(_)));
    }
}
