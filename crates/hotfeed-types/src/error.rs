//! Error types shared by the hotfeed crates.

use thiserror::Error;

/// Unified error type for configuration and domain validation.
#[derive(Debug, Error)]
pub enum FeedTypesError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FeedTypesError::Config("missing db_path".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing db_path");

        let err = FeedTypesError::InvalidInput("unknown counter".to_string());
        assert_eq!(err.to_string(), "Invalid input: unknown counter");
    }
}
