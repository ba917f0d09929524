//! Relay error types.

use thiserror::Error;

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors from a single relay or from building/validating events.
///
/// Per-relay failures are swallowed by the sync engine and only show up in
/// logs and [`crate::PublishReport`]s.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("connection to {relay} failed: {message}")]
    Connect { relay: String, message: String },

    #[error("{relay} timed out during {operation}")]
    Timeout { relay: String, operation: &'static str },

    #[error("{relay} rejected event: {message}")]
    Rejected { relay: String, message: String },

    #[error("{relay} closed the subscription: {message}")]
    SubscriptionClosed { relay: String, message: String },

    #[error("protocol error from {relay}: {message}")]
    Protocol { relay: String, message: String },

    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("crypto error: {0}")]
    Crypto(#[from] dayseal_crypto::CryptoError),
}

impl RelayError {
    pub(crate) fn protocol(relay: &str, message: impl Into<String>) -> Self {
        Self::Protocol {
            relay: relay.to_string(),
            message: message.into(),
        }
    }
}
