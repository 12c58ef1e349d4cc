//! Error types for the application

use thiserror::Error;

/// Result type alias using our EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Upstream provider could not be reached (timeout, transport, non-success status)
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Upstream provider answered with a body lacking the expected event list
    #[error("Provider returned a malformed response: {0}")]
    ProviderMalformedResponse(String),

    /// Sport identifier with no configured provider endpoint
    #[error("Unknown sport: {0}")]
    UnknownSport(String),

    /// Inbound frame that does not decode to a known request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// WebSocket transport errors
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether this error came from the upstream provider
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            EngineError::ProviderUnavailable(_) | EngineError::ProviderMalformedResponse(_)
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for EngineError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        EngineError::WebSocket(err.to_string())
    }
}
