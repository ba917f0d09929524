//! Relay backup and restore of sealed records.
//!
//! Records travel as addressable events tagged `<namespace>:<date>`, so
//! republishing a date replaces the earlier event on conformant relays.
//! Relay failures are logged and folded into counts; nothing here retries.

use crate::config::RelayConfig;
use crate::error::RelayResult;
use crate::event::{parse_address, record_event};
use crate::pool::RelayPool;
use crate::transport::RelayConnection;
use crate::types::{Filter, PublishReport, RelayEvent};
use dayseal_crypto::{Identity, KEY_SIZE};
use dayseal_types::{RecordDate, SealedRecord};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Publishes to and fetches from a fixed relay set.
#[derive(Clone)]
pub struct RelaySync {
    config: RelayConfig,
    pool: RelayPool,
}

impl RelaySync {
    /// Connects to the relays listed in `config` over WebSocket.
    pub fn new(config: RelayConfig) -> RelayResult<Self> {
        config.validate()?;
        let pool = RelayPool::from_config(&config);
        Ok(Self { config, pool })
    }

    /// Uses the given relays instead of `config.relays`.
    pub fn with_relays(
        config: RelayConfig,
        relays: Vec<Arc<dyn RelayConnection>>,
    ) -> RelayResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            pool: RelayPool::new(relays),
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn relay_urls(&self) -> Vec<String> {
        self.pool.urls()
    }

    /// Signs the event for `record`. Needs the unlocked identity.
    pub fn prepare(&self, record: &SealedRecord, identity: &Identity) -> RelayResult<RelayEvent> {
        record_event(identity, &self.config, record)
    }

    /// Broadcasts an already signed event.
    pub async fn broadcast(&self, event: &RelayEvent) -> PublishReport {
        self.pool.broadcast(event).await
    }

    /// Signs and broadcasts one record. Only signing errors are returned;
    /// per-relay outcomes are in the report.
    pub async fn publish(
        &self,
        record: &SealedRecord,
        identity: &Identity,
    ) -> RelayResult<PublishReport> {
        let event = self.prepare(record, identity)?;
        let report = self.broadcast(&event).await;
        if !report.is_accepted() {
            warn!(date = %record.date, "no relay accepted the record");
        }
        Ok(report)
    }

    /// Signs every record. Records that fail to sign are logged and left
    /// out.
    pub fn prepare_all(&self, records: &[SealedRecord], identity: &Identity) -> Vec<RelayEvent> {
        records
            .iter()
            .filter_map(|record| match self.prepare(record, identity) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(date = %record.date, "could not sign record: {e}");
                    None
                }
            })
            .collect()
    }

    /// Broadcasts signed events one at a time, calling
    /// `on_progress(done, total)` after each regardless of its outcome.
    /// Returns how many events at least one relay accepted.
    pub async fn broadcast_all<F>(&self, events: &[RelayEvent], mut on_progress: F) -> usize
    where
        F: FnMut(usize, usize) + Send,
    {
        let total = events.len();
        let mut accepted = 0;
        for (i, event) in events.iter().enumerate() {
            let report = self.broadcast(event).await;
            if report.is_accepted() {
                accepted += 1;
            } else {
                warn!(event = %event.id, "no relay accepted the record");
            }
            on_progress(i + 1, total);
        }
        info!(accepted, total, "backup finished");
        accepted
    }

    /// Signs then broadcasts `records`, see [`RelaySync::broadcast_all`].
    pub async fn publish_all<F>(
        &self,
        records: &[SealedRecord],
        identity: &Identity,
        on_progress: F,
    ) -> usize
    where
        F: FnMut(usize, usize) + Send,
    {
        let events = self.prepare_all(records, identity);
        self.broadcast_all(&events, on_progress).await
    }

    /// Every record published by `public`, one per date.
    ///
    /// Events are verified and must be authored by `public`. When relays
    /// disagree the first event seen wins, in relay configuration order.
    /// If no relay answers the result is empty.
    pub async fn fetch_all(&self, public: &[u8; KEY_SIZE]) -> Vec<SealedRecord> {
        let author = hex::encode(public);
        let filter = Filter {
            authors: vec![author.clone()],
            kinds: vec![self.config.event_kind],
            d_tags: vec![],
        };
        let events = self.pool.query_all(&filter).await;
        let prefix = self.config.address_prefix();

        let mut seen: HashSet<RecordDate> = HashSet::new();
        let mut records = Vec::new();
        for event in events {
            if event.pubkey != author || event.kind != self.config.event_kind {
                warn!(event = %event.id, "dropping event outside the requested filter");
                continue;
            }
            if let Err(e) = event.verify() {
                warn!(event = %event.id, "dropping unverifiable event: {e}");
                continue;
            }
            let Some(date) = event.d_tag().and_then(|d| parse_address(&prefix, d)) else {
                debug!(event = %event.id, "skipping event from another namespace");
                continue;
            };
            if seen.insert(date) {
                records.push(SealedRecord {
                    date,
                    ciphertext: event.content,
                });
            }
        }
        info!(count = records.len(), "fetched records from relays");
        records
    }
}
