//! Relay configuration.

use crate::error::{RelayError, RelayResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_RELAYS: [&str; 3] = [
    "wss://relay.damus.io",
    "wss://nos.lol",
    "wss://relay.nostr.band",
];

/// Addressable events in the 30000..40000 range are replaced per `d` tag.
pub const APP_DATA_KIND: u16 = 30078;

/// Configuration for relay backup and restore.
///
/// The relay list is fixed at deploy time; there is no runtime discovery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// WebSocket relay URLs, queried in this order.
    pub relays: Vec<String>,

    /// Prefix of every record's address tag (`<namespace>:<date>`).
    pub namespace: String,

    /// Event kind records are published under.
    pub event_kind: u16,

    /// Time allowed to open a relay connection (seconds).
    pub connect_timeout_secs: u64,

    /// Time allowed for an `OK` or for the next message of a query (seconds).
    pub response_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            relays: DEFAULT_RELAYS.iter().map(|r| r.to_string()).collect(),
            namespace: "goaltracker".to_string(),
            event_kind: APP_DATA_KIND,
            connect_timeout_secs: 10,
            response_timeout_secs: 15,
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> RelayResult<()> {
        if self.relays.is_empty() {
            return Err(RelayError::Config("relay list is empty".into()));
        }
        for url in &self.relays {
            if !(url.starts_with("wss://") || url.starts_with("ws://")) {
                return Err(RelayError::Config(format!(
                    "relay url must use ws:// or wss://: {url}"
                )));
            }
        }
        if self.namespace.is_empty() || self.namespace.contains(':') {
            return Err(RelayError::Config(
                "namespace must be non-empty and must not contain ':'".into(),
            ));
        }
        if !(30_000..40_000).contains(&self.event_kind) {
            return Err(RelayError::Config(format!(
                "event kind {} is not addressable (30000..40000)",
                self.event_kind
            )));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    /// Address-tag prefix including the separator.
    pub fn address_prefix(&self) -> String {
        format!("{}:", self.namespace)
    }
}
