//! Error types for the application

use thiserror::Error;

/// Result type alias using our TrackerError
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Main error type for tracker operations
#[derive(Error, Debug)]
pub enum TrackerError {
    /// WebSocket send/receive errors
    #[error("WebSocket communication error: {0}")]
    WebSocketCommunication(String),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Persistence errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Price source has no data for the token
    #[error("Token data unavailable: {0}")]
    TokenUnavailable(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Rejected input at a call boundary
    #[error("Validation error: {0}")]
    Validation(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Channel send errors
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for TrackerError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        TrackerError::WebSocketCommunication(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for TrackerError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        TrackerError::Timeout(err.to_string())
    }
}
