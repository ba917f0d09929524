//! Building, signing and verifying record events.

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::types::RelayEvent;
use dayseal_crypto::{Identity, KEY_SIZE, verify_signature};
use dayseal_types::{RecordDate, SealedRecord};
use sha2::{Digest, Sha256};

/// SHA-256 over `[0, pubkey, created_at, kind, tags, content]`.
pub fn compute_id(
    pubkey: &str,
    created_at: i64,
    kind: u16,
    tags: &[Vec<String>],
    content: &str,
) -> RelayResult<[u8; 32]> {
    let canonical = serde_json::to_string(&serde_json::json!([
        0, pubkey, created_at, kind, tags, content
    ]))?;
    Ok(Sha256::digest(canonical.as_bytes()).into())
}

/// `<namespace>:<date>`.
pub fn address_for(namespace: &str, date: RecordDate) -> String {
    format!("{namespace}:{date}")
}

/// Extracts the date from an address tag. `None` when the tag belongs to a
/// different namespace or the suffix is not a calendar date.
pub fn parse_address(prefix: &str, address: &str) -> Option<RecordDate> {
    address
        .strip_prefix(prefix)
        .and_then(|suffix| RecordDate::parse(suffix).ok())
}

impl RelayEvent {
    /// Builds and signs an event authored by `identity`.
    pub fn sign(
        identity: &Identity,
        kind: u16,
        tags: Vec<Vec<String>>,
        content: String,
        created_at: i64,
    ) -> RelayResult<Self> {
        let pubkey = identity.public_hex();
        let id = compute_id(&pubkey, created_at, kind, &tags, &content)?;
        let sig = identity.sign(&id)?;
        Ok(Self {
            id: hex::encode(id),
            pubkey,
            created_at,
            kind,
            tags,
            content,
            sig: hex::encode(sig),
        })
    }

    /// Recomputes the id and checks the signature against `pubkey`.
    pub fn verify(&self) -> RelayResult<()> {
        let expected = compute_id(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )?;
        if hex::encode(expected) != self.id {
            return Err(RelayError::InvalidEvent(format!(
                "id mismatch for {}",
                self.id
            )));
        }
        let pubkey: [u8; KEY_SIZE] = hex::decode(&self.pubkey)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| RelayError::InvalidEvent("malformed pubkey".into()))?;
        let sig = hex::decode(&self.sig)
            .map_err(|_| RelayError::InvalidEvent("malformed signature".into()))?;
        if !verify_signature(&pubkey, &expected, &sig) {
            return Err(RelayError::InvalidEvent(format!(
                "bad signature on {}",
                self.id
            )));
        }
        Ok(())
    }
}

/// The addressable event carrying one sealed record.
pub fn record_event(
    identity: &Identity,
    config: &RelayConfig,
    record: &SealedRecord,
) -> RelayResult<RelayEvent> {
    let tags = vec![vec![
        "d".to_string(),
        address_for(&config.namespace, record.date),
    ]];
    RelayEvent::sign(
        identity,
        config.event_kind,
        tags,
        record.ciphertext.clone(),
        chrono::Utc::now().timestamp(),
    )
}
