//! Error types for the crypto layer.

use thiserror::Error;

/// Errors from key wrapping, identity decoding and self-encryption.
///
/// `Authentication` and `Decryption` are deliberately opaque: they never
/// say whether the key or the data was at fault.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid identity format: {0}")]
    InvalidIdentityFormat(String),

    #[error("key encoding failed: {0}")]
    Encoding(String),

    #[error("authentication failed (wrong PIN or corrupted data)")]
    Authentication,

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("plaintext length {0} outside 1..=65535")]
    InvalidPlaintextLength(usize),

    #[error("signing failed: {0}")]
    Signing(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
