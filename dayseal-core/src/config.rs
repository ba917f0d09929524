//! Tracker configuration.

use crate::error::{TrackerError, TrackerResult};
use dayseal_relay::RelayConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What happens to the relay event signed on every save.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// Queued to a background worker; failures are logged and dropped.
    #[default]
    Background,
    /// Broadcast before `save_record` returns; failures are logged.
    Await,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// DuckDB file. `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,

    pub relay: RelayConfig,

    pub publish_mode: PublishMode,

    /// Events the background publisher buffers before `save_record` waits.
    pub publish_queue_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            relay: RelayConfig::default(),
            publish_mode: PublishMode::Background,
            publish_queue_capacity: 64,
        }
    }
}

impl TrackerConfig {
    /// Loads a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> TrackerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TrackerResult<()> {
        self.relay
            .validate()
            .map_err(|e| TrackerError::Config(e.to_string()))?;
        if self.publish_queue_capacity == 0 {
            return Err(TrackerError::Config(
                "publish_queue_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
