//! Relay transport abstraction.

use crate::error::RelayResult;
use crate::types::{Filter, RelayEvent};
use async_trait::async_trait;

/// One relay endpoint.
///
/// Implementations own their connection lifecycle and enforce their own
/// timeouts. The sync engine never retries.
#[async_trait]
pub trait RelayConnection: Send + Sync {
    /// Endpoint URL, used in logs and reports.
    fn url(&self) -> &str;

    /// Sends `event` and waits for the relay's `OK`. An `OK false` is
    /// [`crate::RelayError::Rejected`].
    async fn publish(&self, event: &RelayEvent) -> RelayResult<()>;

    /// Returns every stored event matching `filter`, up to end-of-stored-events.
    async fn query(&self, filter: &Filter) -> RelayResult<Vec<RelayEvent>>;
}
