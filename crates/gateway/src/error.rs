//! Typed errors for the broker gateway.

use thiserror::Error;

/// Errors surfaced by the broker REST gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP-level failure.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Body or status text.
        message: String,
    },

    /// The broker answered but flagged the request as failed.
    #[error("broker rejected request: {0}")]
    Broker(String),

    /// A required field was absent from an otherwise valid payload.
    #[error("missing field in broker payload: {0}")]
    MissingField(String),

    /// Payload did not deserialize.
    #[error("malformed broker payload: {0}")]
    Malformed(String),

    /// Transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// Request timed out.
    #[error("request timeout: {0}")]
    Timeout(String),
}

impl GatewayError {
    /// True when a retry on a later tick is reasonable.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Result alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
