//! Auth session: the only holder of the decrypted identity.
//!
//! ```text
//! NoIdentity --setup--> Unlocked <--unlock/lock--> Locked
//!     ^                                               |
//!     +------------------------reset------------------+
//! ```
//!
//! The secret is decrypted into memory by `setup`/`unlock` and dropped
//! (zeroized) by `lock`/`reset` or when the session is dropped. It is never
//! written anywhere unencrypted.

use crate::error::{TrackerError, TrackerResult};
use crate::run_blocking;
use dayseal_crypto::{Identity, PinSealed, seal};
use dayseal_storage::LocalStore;
use dayseal_types::{IDENTITY_RECORD_ID, SealedIdentity};
use tracing::{info, warn};
use zeroize::Zeroizing;

pub const MIN_PIN_LENGTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoIdentity,
    /// An identity exists; its public encoding stays visible.
    Locked { public_id: String },
    Unlocked { public_id: String },
}

pub struct AuthSession {
    store: LocalStore,
    public_id: Option<String>,
    identity: Option<Identity>,
}

impl AuthSession {
    /// Starts `Locked` if an identity is persisted, otherwise `NoIdentity`.
    pub async fn open(store: LocalStore) -> TrackerResult<Self> {
        let reader = store.clone();
        let sealed = run_blocking(move || Ok(reader.get_identity()?)).await?;
        Ok(Self {
            store,
            public_id: sealed.map(|s| s.public_id),
            identity: None,
        })
    }

    pub fn state(&self) -> SessionState {
        match (&self.public_id, &self.identity) {
            (None, _) => SessionState::NoIdentity,
            (Some(public_id), None) => SessionState::Locked {
                public_id: public_id.clone(),
            },
            (Some(public_id), Some(_)) => SessionState::Unlocked {
                public_id: public_id.clone(),
            },
        }
    }

    pub fn public_id(&self) -> Option<&str> {
        self.public_id.as_deref()
    }

    pub fn is_unlocked(&self) -> bool {
        self.identity.is_some()
    }

    /// The unlocked identity, or [`TrackerError::NotAuthenticated`].
    pub fn identity(&self) -> TrackerResult<&Identity> {
        self.identity.as_ref().ok_or(TrackerError::NotAuthenticated)
    }

    /// Wraps `secret` under `pin`, persists it and unlocks.
    pub async fn setup(&mut self, secret: &str, pin: &str) -> TrackerResult<()> {
        if pin.chars().count() < MIN_PIN_LENGTH {
            return Err(TrackerError::PinTooShort);
        }
        let reader = self.store.clone();
        if run_blocking(move || Ok(reader.has_identity()?)).await? {
            return Err(TrackerError::IdentityExists);
        }

        let identity = Identity::from_secret(secret.trim())?;
        let encoded = identity.secret_encoding()?;
        let pin = Zeroizing::new(pin.to_string());
        let sealed = run_blocking(move || Ok(seal(&encoded, &pin)?)).await?;

        let record = SealedIdentity {
            id: IDENTITY_RECORD_ID.to_string(),
            encrypted_secret: sealed.ciphertext,
            salt: sealed.salt,
            iv: sealed.iv,
            public_id: identity.public_id(),
        };
        let writer = self.store.clone();
        let stored = record.clone();
        run_blocking(move || Ok(writer.put_identity(&stored)?)).await?;

        info!(public_id = %record.public_id, "identity set up");
        self.public_id = Some(record.public_id);
        self.identity = Some(identity);
        Ok(())
    }

    /// Unseals the persisted identity. Every failure past loading the record
    /// is [`TrackerError::IncorrectPin`] and leaves the session locked.
    pub async fn unlock(&mut self, pin: &str) -> TrackerResult<()> {
        let reader = self.store.clone();
        let sealed = run_blocking(move || Ok(reader.get_identity()?))
            .await?
            .ok_or(TrackerError::NoIdentity)?;

        let wrapped = PinSealed {
            ciphertext: sealed.encrypted_secret,
            salt: sealed.salt,
            iv: sealed.iv,
        };
        let pin = Zeroizing::new(pin.to_string());
        let secret = run_blocking(move || {
            wrapped.unseal(&pin).map_err(|_| TrackerError::IncorrectPin)
        })
        .await?;

        let identity = Identity::from_secret(&secret).map_err(|_| {
            warn!("unsealed value is not a valid secret");
            TrackerError::IncorrectPin
        })?;
        let public_id = identity.public_id();
        if public_id != sealed.public_id {
            warn!(stored = %sealed.public_id, derived = %public_id, "stored public id does not match secret");
        }

        info!(public_id = %public_id, "session unlocked");
        self.public_id = Some(public_id);
        self.identity = Some(identity);
        Ok(())
    }

    /// Drops the in-memory identity. Always succeeds.
    pub fn lock(&mut self) {
        if self.identity.take().is_some() {
            info!("session locked");
        }
    }

    /// Deletes the sealed identity and every local record.
    pub async fn reset(&mut self) -> TrackerResult<()> {
        let writer = self.store.clone();
        run_blocking(move || Ok(writer.delete_identity()?)).await?;
        self.identity = None;
        self.public_id = None;
        info!("identity and local records deleted");
        Ok(())
    }
}
