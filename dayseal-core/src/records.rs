//! Sealing daily records and moving them through the local store.

use crate::error::{TrackerError, TrackerResult};
use crate::run_blocking;
use dayseal_crypto::{ConversationKey, Identity, decrypt_with_key, encrypt_with_key};
use dayseal_storage::LocalStore;
use dayseal_types::{DailyRecord, RecordDate, SealedRecord};
use tracing::{debug, warn};

/// Encrypts a record to its author.
pub fn seal_record(identity: &Identity, record: &DailyRecord) -> TrackerResult<SealedRecord> {
    let key = identity.self_key()?;
    seal_with_key(&key, record)
}

/// Decrypts a sealed record. Tampered, foreign or mislabelled ciphertext is
/// [`TrackerError::Decryption`].
pub fn open_record(identity: &Identity, sealed: &SealedRecord) -> TrackerResult<DailyRecord> {
    let key = identity.self_key()?;
    open_with_key(&key, sealed)
}

fn seal_with_key(key: &ConversationKey, record: &DailyRecord) -> TrackerResult<SealedRecord> {
    let json = serde_json::to_string(record)?;
    Ok(SealedRecord {
        date: record.date,
        ciphertext: encrypt_with_key(key, &json)?,
    })
}

fn open_with_key(key: &ConversationKey, sealed: &SealedRecord) -> TrackerResult<DailyRecord> {
    let failed = || TrackerError::Decryption { date: sealed.date };
    let json = decrypt_with_key(key, &sealed.ciphertext).map_err(|_| failed())?;
    let record: DailyRecord = serde_json::from_str(&json).map_err(|_| failed())?;
    // The key date is plaintext; the payload date is authenticated.
    if record.date != sealed.date {
        return Err(failed());
    }
    Ok(record)
}

/// Decrypts a batch, skipping records that fail.
fn open_all(identity: &Identity, sealed: Vec<SealedRecord>) -> TrackerResult<Vec<DailyRecord>> {
    let key = identity.self_key()?;
    let total = sealed.len();
    let records: Vec<DailyRecord> = sealed
        .iter()
        .filter_map(|s| match open_with_key(&key, s) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(date = %s.date, "skipping record: {e}");
                None
            }
        })
        .collect();
    debug!(loaded = records.len(), total, "decrypted records");
    Ok(records)
}

/// Record-level view of the local store.
#[derive(Clone)]
pub struct RecordBook {
    store: LocalStore,
}

impl RecordBook {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Seals and upserts `record`, returning what was stored.
    pub async fn save(&self, identity: &Identity, record: &DailyRecord) -> TrackerResult<SealedRecord> {
        let sealed = seal_record(identity, record)?;
        let store = self.store.clone();
        let stored = sealed.clone();
        run_blocking(move || Ok(store.put_record(&stored)?)).await?;
        debug!(date = %sealed.date, "record saved");
        Ok(sealed)
    }

    pub async fn load(&self, identity: &Identity, date: RecordDate) -> TrackerResult<Option<DailyRecord>> {
        let store = self.store.clone();
        let sealed = run_blocking(move || Ok(store.get_record(date)?)).await?;
        sealed.map(|s| open_record(identity, &s)).transpose()
    }

    /// Records in `[start, end]` in date order. Undecryptable ones are skipped.
    pub async fn load_range(
        &self,
        identity: &Identity,
        start: RecordDate,
        end: RecordDate,
    ) -> TrackerResult<Vec<DailyRecord>> {
        let store = self.store.clone();
        let sealed = run_blocking(move || Ok(store.records_in_range(start, end)?)).await?;
        open_all(identity, sealed)
    }

    pub async fn load_all(&self, identity: &Identity) -> TrackerResult<Vec<DailyRecord>> {
        let sealed = self.sealed_all().await?;
        open_all(identity, sealed)
    }

    /// Every stored record, still sealed, in date order.
    pub async fn sealed_all(&self) -> TrackerResult<Vec<SealedRecord>> {
        let store = self.store.clone();
        run_blocking(move || Ok(store.all_records()?)).await
    }

    /// Upserts `records`, replacing local rows with the same date.
    pub async fn merge(&self, records: Vec<SealedRecord>) -> TrackerResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let store = self.store.clone();
        run_blocking(move || Ok(store.put_records(&records)?)).await
    }
}
