//! Crypto layer for dayseal.
//!
//! Three pieces, all synchronous and free of I/O:
//!
//! - **PIN key-wrap** ([`pin_wrap`]): PBKDF2-HMAC-SHA256 (100,000 rounds)
//!   derives a key from the user's PIN that seals the identity secret with
//!   AES-256-GCM. A wrong PIN fails authentication instead of producing
//!   garbage.
//!
//! - **Identity codec** ([`identity`]): secp256k1 keypairs with bech32
//!   `nsec`/`npub` encodings and BIP-340 signatures.
//!
//! - **Self-encryption** ([`self_encrypt`]): NIP-44 v2 with the holder's own
//!   public key, giving a stable per-identity key for daily records without
//!   storing a second secret.
//!
//! # Architecture
//!
//! Only the sealed identity is ever persisted. The raw secret lives in an
//! [`Identity`] while the session is unlocked and is zeroized on drop.

mod error;
pub mod identity;
pub mod pin_wrap;
pub mod self_encrypt;

pub use error::{CryptoError, CryptoResult};
pub use identity::{
    Identity, KEY_SIZE, decode_public, encode_public, is_valid_secret, public_from_secret,
    raw_private_from_secret, verify_signature,
};
pub use pin_wrap::{PBKDF2_ITERATIONS, PinSealed, seal, unseal};
pub use self_encrypt::{
    ConversationKey, calc_padded_len, conversation_key, decrypt_from_self, decrypt_with_key,
    encrypt_to_self, encrypt_with_key,
};
