//! Tracker error types.

use dayseal_crypto::CryptoError;
use dayseal_relay::RelayError;
use dayseal_storage::StorageError;
use dayseal_types::{RecordDate, TypesError};
use thiserror::Error;

use crate::session::MIN_PIN_LENGTH;

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("incorrect PIN")]
    IncorrectPin,

    #[error("not authenticated: unlock the session first")]
    NotAuthenticated,

    #[error("invalid identity format: {0}")]
    InvalidIdentityFormat(String),

    #[error("record for {date} could not be decrypted")]
    Decryption { date: RecordDate },

    #[error("PIN must be at least {} characters", MIN_PIN_LENGTH)]
    PinTooShort,

    #[error("an identity is already set up; reset first")]
    IdentityExists,

    #[error("no identity has been set up")]
    NoIdentity,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("crypto error: {0}")]
    Crypto(CryptoError),

    #[error("relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("invalid data: {0}")]
    Types(#[from] TypesError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("background publisher is not running")]
    PublisherStopped,

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<CryptoError> for TrackerError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidIdentityFormat(message) => Self::InvalidIdentityFormat(message),
            other => Self::Crypto(other),
        }
    }
}
