//! Identity codec.
//!
//! An identity is a secp256k1 keypair. The secret travels as a bech32
//! string with the `nsec` prefix and the x-only (BIP-340) public key as
//! one with the `npub` prefix. Decoding always checks the checksum and the
//! prefix, so an `npub` is never accepted where an `nsec` is expected.
//! The public key is only ever computed from the secret.

use crate::error::{CryptoError, CryptoResult};
use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};
use k256::schnorr::{Signature, SigningKey, VerifyingKey};
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

pub const KEY_SIZE: usize = 32;

const SECRET_HRP: Hrp = Hrp::parse_unchecked("nsec");
const PUBLIC_HRP: Hrp = Hrp::parse_unchecked("npub");

fn decode_key(encoded: &str, expected: Hrp) -> CryptoResult<Zeroizing<[u8; KEY_SIZE]>> {
    let checked = CheckedHrpstring::new::<Bech32>(encoded.trim())
        .map_err(|e| CryptoError::InvalidIdentityFormat(e.to_string()))?;
    if checked.hrp() != expected {
        return Err(CryptoError::InvalidIdentityFormat(format!(
            "expected {expected} prefix, got {}",
            checked.hrp()
        )));
    }

    let data = Zeroizing::new(checked.byte_iter().collect::<Vec<u8>>());
    if data.len() != KEY_SIZE {
        return Err(CryptoError::InvalidIdentityFormat(format!(
            "expected {KEY_SIZE} key bytes, got {}",
            data.len()
        )));
    }
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    key.copy_from_slice(&data);
    Ok(key)
}

fn encode_key(hrp: Hrp, data: &[u8]) -> CryptoResult<String> {
    bech32::encode::<Bech32>(hrp, data).map_err(|e| CryptoError::Encoding(e.to_string()))
}

fn signing_key(secret: &[u8; KEY_SIZE]) -> CryptoResult<SigningKey> {
    SigningKey::from_bytes(secret)
        .map_err(|_| CryptoError::InvalidIdentityFormat("secret is not a valid scalar".into()))
}

/// Whether `s` is a well-formed secret encoding of a usable scalar.
pub fn is_valid_secret(s: &str) -> bool {
    raw_private_from_secret(s).is_ok()
}

/// Decodes a secret encoding into the raw 32-byte scalar.
pub fn raw_private_from_secret(s: &str) -> CryptoResult<Zeroizing<[u8; KEY_SIZE]>> {
    let secret = decode_key(s, SECRET_HRP)?;
    signing_key(&secret)?;
    Ok(secret)
}

/// Derives the public encoding from a secret encoding.
pub fn public_from_secret(s: &str) -> CryptoResult<String> {
    Ok(Identity::from_secret(s)?.public_id())
}

/// Decodes a public encoding into the raw x-only key.
pub fn decode_public(s: &str) -> CryptoResult<[u8; KEY_SIZE]> {
    let key = decode_key(s, PUBLIC_HRP)?;
    VerifyingKey::from_bytes(key.as_slice())
        .map_err(|_| CryptoError::InvalidIdentityFormat("not a curve point".into()))?;
    Ok(*key)
}

pub fn encode_public(public: &[u8; KEY_SIZE]) -> CryptoResult<String> {
    encode_key(PUBLIC_HRP, public)
}

/// Checks a BIP-340 signature over `message` by the x-only key `public`.
pub fn verify_signature(public: &[u8; KEY_SIZE], message: &[u8], signature: &[u8]) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(public) else {
        return false;
    };
    let Ok(signature) = Signature::try_from(signature) else {
        return false;
    };
    key.verify_raw(message, &signature).is_ok()
}

/// A decoded keypair held in memory while the session is unlocked.
///
/// The secret scalar is zeroized on drop. `Debug` only prints the public
/// encoding.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Identity {
    secret: [u8; KEY_SIZE],
    #[zeroize(skip)]
    public: [u8; KEY_SIZE],
    #[zeroize(skip)]
    public_id: String,
}

impl Identity {
    /// Decodes and validates a secret encoding.
    pub fn from_secret(s: &str) -> CryptoResult<Self> {
        let secret = raw_private_from_secret(s)?;
        Self::from_raw(&secret)
    }

    pub fn from_raw(secret: &[u8; KEY_SIZE]) -> CryptoResult<Self> {
        let key = signing_key(secret)?;
        let mut public = [0u8; KEY_SIZE];
        public.copy_from_slice(&key.verifying_key().to_bytes());
        Ok(Self {
            secret: *secret,
            public,
            public_id: encode_public(&public)?,
        })
    }

    /// Draws a fresh random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let mut candidate = Zeroizing::new([0u8; KEY_SIZE]);
        loop {
            rng.fill_bytes(candidate.as_mut_slice());
            // Rejects zero and values >= the group order; practically never loops.
            if let Ok(identity) = Self::from_raw(&candidate) {
                return identity;
            }
        }
    }

    pub fn secret_key(&self) -> &[u8; KEY_SIZE] {
        &self.secret
    }

    pub fn public_key(&self) -> &[u8; KEY_SIZE] {
        &self.public
    }

    /// Lowercase hex of the x-only public key, as used on relays.
    pub fn public_hex(&self) -> String {
        hex::encode(self.public)
    }

    /// The `nsec` encoding. Callers should not keep it around.
    pub fn secret_encoding(&self) -> CryptoResult<Zeroizing<String>> {
        encode_key(SECRET_HRP, &self.secret).map(Zeroizing::new)
    }

    /// The `npub` encoding.
    pub fn public_id(&self) -> String {
        self.public_id.clone()
    }

    /// BIP-340 signature over `message` with fresh auxiliary randomness.
    pub fn sign(&self, message: &[u8]) -> CryptoResult<[u8; 64]> {
        let key = signing_key(&self.secret)?;
        let mut aux = [0u8; 32];
        rand::rng().fill_bytes(&mut aux);
        let signature = key
            .sign_raw(message, &aux)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        Ok(signature.to_bytes())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("public", &self.public_id)
            .finish_non_exhaustive()
    }
}
