//! Error types for the player and its backend client.

use thiserror::Error;

/// Main error type for all player operations.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// HTTP request failed (connection refused, timeout, bad body).
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Backend answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the `error` field, or the raw body.
        message: String,
    },

    /// Backend answered 2xx but the body lacks the expected fields.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A URL could not be built from the configured base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The audio sink refused to play the current source.
    #[error("Playback error: {0}")]
    Playback(String),

    /// No audio output device could be opened.
    #[error("No audio output device: {0}")]
    NoAudioDevice(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for player operations.
pub type Result<T> = std::result::Result<T, PlayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = PlayerError::Api {
            status: 400,
            message: "Query parameter required".to_string(),
        };
        assert_eq!(err.to_string(), "API error (400): Query parameter required");
    }
}
