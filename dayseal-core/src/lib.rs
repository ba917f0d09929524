//! dayseal core: the encrypted local-first layer behind the habit tracker.
//!
//! [`Tracker`] ties together:
//!
//! - [`AuthSession`]: PIN-wrapped identity, decrypted into memory only
//!   while unlocked.
//! - [`RecordBook`]: daily records self-encrypted to the identity and kept
//!   in the DuckDB store.
//! - Relay backup through `dayseal_relay`, with every save published in
//!   the background (or inline, see [`PublishMode`]).
//!
//! All storage and PBKDF2 work runs on tokio's blocking pool.

pub mod config;
mod error;
pub mod logging;
pub mod publisher;
pub mod records;
pub mod session;
pub mod tracker;

pub use config::{PublishMode, TrackerConfig};
pub use error::{TrackerError, TrackerResult};
pub use publisher::{Publisher, PublisherHandle, create_publisher, spawn_publisher};
pub use records::{RecordBook, open_record, seal_record};
pub use session::{AuthSession, MIN_PIN_LENGTH, SessionState};
pub use tracker::Tracker;

/// Runs blocking storage or key-derivation work off the async threads.
pub(crate) async fn run_blocking<T, F>(f: F) -> TrackerResult<T>
where
    F: FnOnce() -> TrackerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
