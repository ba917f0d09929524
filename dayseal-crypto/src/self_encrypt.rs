//! Self-encryption codec (NIP-44 version 2).
//!
//! The conversation key is the HKDF-SHA256 extract of the ECDH shared x
//! coordinate between the holder's secret and a public key, salted with
//! `nip44-v2`. Passing the holder's own public key gives a stable
//! per-identity key that never needs to be stored.
//!
//! Per message, a random 32-byte nonce is expanded into a ChaCha20 key,
//! ChaCha20 nonce and HMAC key. The plaintext is length-prefixed and padded
//! before encryption, and the MAC covers nonce and ciphertext. Payload
//! layout, base64-encoded:
//!
//! ```text
//! version (1 = 0x02) | nonce (32) | ciphertext (34..=65538) | mac (32)
//! ```

use crate::error::{CryptoError, CryptoResult};
use crate::identity::Identity;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chacha20::ChaCha20;
use chacha20::cipher::{KeyIvInit, StreamCipher};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use k256::{PublicKey, SecretKey};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

pub const VERSION: u8 = 2;
pub const MIN_PLAINTEXT_SIZE: usize = 1;
pub const MAX_PLAINTEXT_SIZE: usize = 65_535;

const SALT: &[u8] = b"nip44-v2";
const NONCE_SIZE: usize = 32;
const MAC_SIZE: usize = 32;
// Smallest padded message (32) plus the 2-byte length prefix.
const MIN_CIPHERTEXT_SIZE: usize = 34;
const MIN_PAYLOAD_SIZE: usize = 1 + NONCE_SIZE + MIN_CIPHERTEXT_SIZE + MAC_SIZE;
const MAX_PAYLOAD_SIZE: usize = 1 + NONCE_SIZE + 2 + MAX_PLAINTEXT_SIZE + 1 + MAC_SIZE;

fn decryption(msg: &str) -> CryptoError {
    CryptoError::Decryption(msg.to_string())
}

/// Symmetric key shared between a secret and a public key. Zeroized on drop.
pub struct ConversationKey(Zeroizing<[u8; 32]>);

impl ConversationKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Derives the conversation key for `secret` and the x-only `public` key.
pub fn conversation_key(secret: &[u8; 32], public: &[u8; 32]) -> CryptoResult<ConversationKey> {
    let secret = SecretKey::from_slice(secret)
        .map_err(|_| CryptoError::KeyDerivation("invalid secret scalar".into()))?;

    let mut sec1 = [0u8; 33];
    sec1[0] = 0x02;
    sec1[1..].copy_from_slice(public);
    let public = PublicKey::from_sec1_bytes(&sec1)
        .map_err(|_| CryptoError::KeyDerivation("public key is not a curve point".into()))?;

    let shared = k256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
    let (prk, _) = Hkdf::<Sha256>::extract(Some(SALT), shared.raw_secret_bytes());

    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&prk);
    Ok(ConversationKey(key))
}

struct MessageKeys {
    chacha_key: Zeroizing<[u8; 32]>,
    chacha_nonce: [u8; 12],
    hmac_key: Zeroizing<[u8; 32]>,
}

fn message_keys(key: &ConversationKey, nonce: &[u8; NONCE_SIZE]) -> CryptoResult<MessageKeys> {
    let hk = Hkdf::<Sha256>::from_prk(key.as_bytes())
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let mut okm = Zeroizing::new([0u8; 76]);
    hk.expand(nonce, okm.as_mut_slice())
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let mut keys = MessageKeys {
        chacha_key: Zeroizing::new([0u8; 32]),
        chacha_nonce: [0u8; 12],
        hmac_key: Zeroizing::new([0u8; 32]),
    };
    keys.chacha_key.copy_from_slice(&okm[0..32]);
    keys.chacha_nonce.copy_from_slice(&okm[32..44]);
    keys.hmac_key.copy_from_slice(&okm[44..76]);
    Ok(keys)
}

/// Padded size for an unpadded plaintext of `len` bytes.
pub fn calc_padded_len(len: usize) -> usize {
    if len <= 32 {
        return 32;
    }
    let next_power = 1usize << (usize::BITS - (len - 1).leading_zeros());
    let chunk = if next_power <= 256 { 32 } else { next_power / 8 };
    chunk * ((len - 1) / chunk + 1)
}

fn pad(plaintext: &[u8]) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let len = plaintext.len();
    if !(MIN_PLAINTEXT_SIZE..=MAX_PLAINTEXT_SIZE).contains(&len) {
        return Err(CryptoError::InvalidPlaintextLength(len));
    }
    let mut padded = Zeroizing::new(Vec::with_capacity(2 + calc_padded_len(len)));
    padded.extend_from_slice(&(len as u16).to_be_bytes());
    padded.extend_from_slice(plaintext);
    padded.resize(2 + calc_padded_len(len), 0);
    Ok(padded)
}

fn unpad(padded: &[u8]) -> CryptoResult<&[u8]> {
    if padded.len() < 2 {
        return Err(decryption("invalid padding"));
    }
    let len = u16::from_be_bytes([padded[0], padded[1]]) as usize;
    if len == 0 || padded.len() != 2 + calc_padded_len(len) {
        return Err(decryption("invalid padding"));
    }
    Ok(&padded[2..2 + len])
}

fn mac(hmac_key: &[u8; 32], nonce: &[u8], ciphertext: &[u8]) -> CryptoResult<HmacSha256> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(hmac_key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    mac.update(nonce);
    mac.update(ciphertext);
    Ok(mac)
}

fn encrypt_with_nonce(
    key: &ConversationKey,
    plaintext: &str,
    nonce: &[u8; NONCE_SIZE],
) -> CryptoResult<String> {
    let keys = message_keys(key, nonce)?;
    let mut buffer = pad(plaintext.as_bytes())?;

    let mut cipher = ChaCha20::new_from_slices(keys.chacha_key.as_slice(), &keys.chacha_nonce)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    cipher.apply_keystream(&mut buffer);

    let tag = mac(&keys.hmac_key, nonce, &buffer)?.finalize().into_bytes();

    let mut payload = Vec::with_capacity(1 + NONCE_SIZE + buffer.len() + MAC_SIZE);
    payload.push(VERSION);
    payload.extend_from_slice(nonce);
    payload.extend_from_slice(&buffer);
    payload.extend_from_slice(&tag);
    Ok(STANDARD.encode(payload))
}

/// Encrypts `plaintext` under an already derived conversation key.
pub fn encrypt_with_key(key: &ConversationKey, plaintext: &str) -> CryptoResult<String> {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce);
    encrypt_with_nonce(key, plaintext, &nonce)
}

/// Decrypts a payload under an already derived conversation key.
///
/// Every malformed or unauthenticated input yields
/// [`CryptoError::Decryption`]; nothing is decrypted before the MAC checks.
pub fn decrypt_with_key(key: &ConversationKey, payload: &str) -> CryptoResult<String> {
    if payload.starts_with('#') {
        return Err(decryption("unsupported encryption version"));
    }
    let data = STANDARD
        .decode(payload)
        .map_err(|_| decryption("payload is not base64"))?;
    if !(MIN_PAYLOAD_SIZE..=MAX_PAYLOAD_SIZE).contains(&data.len()) {
        return Err(decryption("invalid payload length"));
    }
    if data[0] != VERSION {
        return Err(decryption("unsupported encryption version"));
    }

    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&data[1..1 + NONCE_SIZE]);
    let (body, tag) = data[1 + NONCE_SIZE..].split_at(data.len() - 1 - NONCE_SIZE - MAC_SIZE);

    let keys = message_keys(key, &nonce)?;
    mac(&keys.hmac_key, &nonce, body)?
        .verify_slice(tag)
        .map_err(|_| decryption("invalid MAC"))?;

    let mut padded = Zeroizing::new(body.to_vec());
    let mut cipher = ChaCha20::new_from_slices(keys.chacha_key.as_slice(), &keys.chacha_nonce)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;
    cipher.apply_keystream(&mut padded);

    let plaintext = unpad(&padded)?;
    String::from_utf8(plaintext.to_vec()).map_err(|_| decryption("plaintext is not UTF-8"))
}

/// Encrypts `plaintext` so only the holder of `secret` can read it back.
pub fn encrypt_to_self(plaintext: &str, secret: &[u8; 32], public: &[u8; 32]) -> CryptoResult<String> {
    encrypt_with_key(&conversation_key(secret, public)?, plaintext)
}

/// Reverses [`encrypt_to_self`].
pub fn decrypt_from_self(payload: &str, secret: &[u8; 32], public: &[u8; 32]) -> CryptoResult<String> {
    let key = conversation_key(secret, public)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;
    decrypt_with_key(&key, payload)
}

impl Identity {
    /// Conversation key of this identity with itself.
    pub fn self_key(&self) -> CryptoResult<ConversationKey> {
        conversation_key(self.secret_key(), self.public_key())
    }

    pub fn encrypt_to_self(&self, plaintext: &str) -> CryptoResult<String> {
        encrypt_to_self(plaintext, self.secret_key(), self.public_key())
    }

    pub fn decrypt_from_self(&self, payload: &str) -> CryptoResult<String> {
        decrypt_from_self(payload, self.secret_key(), self.public_key())
    }
}
