//! Concurrent fan-out over the configured relays.

use crate::config::RelayConfig;
use crate::transport::RelayConnection;
use crate::types::{Filter, PublishReport, RelayEvent};
use crate::websocket::WebSocketRelay;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// A fixed set of relays. Every call waits for all of them to settle; a
/// failing relay never short-circuits the others.
#[derive(Clone)]
pub struct RelayPool {
    relays: Vec<Arc<dyn RelayConnection>>,
}

impl RelayPool {
    pub fn new(relays: Vec<Arc<dyn RelayConnection>>) -> Self {
        Self { relays }
    }

    /// One [`WebSocketRelay`] per configured URL.
    pub fn from_config(config: &RelayConfig) -> Self {
        let relays = config
            .relays
            .iter()
            .map(|url| Arc::new(WebSocketRelay::new(url.clone(), config)) as Arc<dyn RelayConnection>)
            .collect();
        Self::new(relays)
    }

    pub fn len(&self) -> usize {
        self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    pub fn urls(&self) -> Vec<String> {
        self.relays.iter().map(|r| r.url().to_string()).collect()
    }

    /// Sends `event` to every relay at once.
    pub async fn broadcast(&self, event: &RelayEvent) -> PublishReport {
        let outcomes = join_all(self.relays.iter().map(|relay| async move {
            (relay.url().to_string(), relay.publish(event).await)
        }))
        .await;

        let mut report = PublishReport {
            event_id: event.id.clone(),
            ..Default::default()
        };
        for (url, outcome) in outcomes {
            match outcome {
                Ok(()) => {
                    debug!(relay = %url, event = %event.id, "event accepted");
                    report.accepted.push(url);
                }
                Err(e) => {
                    warn!(relay = %url, event = %event.id, "publish failed: {e}");
                    report.failed.push((url, e.to_string()));
                }
            }
        }
        report
    }

    /// Queries every relay at once. Results are concatenated in relay order;
    /// relays that fail contribute nothing.
    pub async fn query_all(&self, filter: &Filter) -> Vec<RelayEvent> {
        let outcomes = join_all(self.relays.iter().map(|relay| async move {
            (relay.url().to_string(), relay.query(filter).await)
        }))
        .await;

        let mut events = Vec::new();
        for (url, outcome) in outcomes {
            match outcome {
                Ok(batch) => {
                    debug!(relay = %url, count = batch.len(), "query answered");
                    events.extend(batch);
                }
                Err(e) => warn!(relay = %url, "query failed: {e}"),
            }
        }
        events
    }
}
