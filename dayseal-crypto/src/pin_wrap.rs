//! PIN key-wrap.
//!
//! The identity secret is sealed under a key derived from a short PIN with
//! PBKDF2-HMAC-SHA256 and encrypted with AES-256-GCM. Each seal draws a
//! fresh salt and IV. Binary fields travel as standard base64.
//!
//! Any unseal failure (bad base64, wrong lengths, wrong PIN, tampered
//! ciphertext, non-UTF-8 plaintext) collapses to
//! [`CryptoError::Authentication`].

use crate::error::{CryptoError, CryptoResult};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const SALT_SIZE: usize = 16;
pub const IV_SIZE: usize = 12;
pub const WRAP_KEY_SIZE: usize = 32;

/// Output of [`seal`]. All fields are base64.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinSealed {
    pub ciphertext: String,
    pub salt: String,
    pub iv: String,
}

fn derive_wrap_key(pin: &str, salt: &[u8]) -> Zeroizing<[u8; WRAP_KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; WRAP_KEY_SIZE]);
    pbkdf2::pbkdf2_hmac::<Sha256>(pin.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key[..]);
    key
}

/// Seals `secret` under `pin`.
pub fn seal(secret: &str, pin: &str) -> CryptoResult<PinSealed> {
    let mut salt = [0u8; SALT_SIZE];
    let mut iv = [0u8; IV_SIZE];
    let mut rng = rand::rng();
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut iv);

    let key = derive_wrap_key(pin, &salt);
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), secret.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("key wrap failed: {e}")))?;

    Ok(PinSealed {
        ciphertext: STANDARD.encode(ciphertext),
        salt: STANDARD.encode(salt),
        iv: STANDARD.encode(iv),
    })
}

/// Recovers the secret sealed by [`seal`].
pub fn unseal(ciphertext: &str, pin: &str, salt: &str, iv: &str) -> CryptoResult<Zeroizing<String>> {
    let ciphertext = STANDARD
        .decode(ciphertext)
        .map_err(|_| CryptoError::Authentication)?;
    let salt = STANDARD.decode(salt).map_err(|_| CryptoError::Authentication)?;
    let iv = STANDARD.decode(iv).map_err(|_| CryptoError::Authentication)?;
    if salt.len() != SALT_SIZE || iv.len() != IV_SIZE {
        return Err(CryptoError::Authentication);
    }

    let key = derive_wrap_key(pin, &salt);
    let cipher =
        Aes256Gcm::new_from_slice(&key[..]).map_err(|_| CryptoError::Authentication)?;
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
            .map_err(|_| CryptoError::Authentication)?,
    );

    let secret = std::str::from_utf8(&plaintext).map_err(|_| CryptoError::Authentication)?;
    Ok(Zeroizing::new(secret.to_owned()))
}

impl PinSealed {
    pub fn unseal(&self, pin: &str) -> CryptoResult<Zeroizing<String>> {
        unseal(&self.ciphertext, pin, &self.salt, &self.iv)
    }
}
