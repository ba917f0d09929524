//! Relay backup for dayseal.
//!
//! Sealed records are published as signed, addressable events (kind 30078,
//! `d` tag `<namespace>:<date>`) to a fixed list of WebSocket relays and
//! fetched back by author.
//!
//! # Architecture
//!
//! - [`RelayConnection`] is one endpoint; [`WebSocketRelay`] is the network
//!   implementation and tests inject in-process relays.
//! - [`RelayPool`] fans every call out to all relays and waits for all of
//!   them to settle.
//! - [`RelaySync`] builds events, publishes records sequentially with
//!   progress, and verifies and deduplicates fetched events.
//!
//! Ciphertext is opaque here. Decryption and merging into the local store
//! belong to the caller.

pub mod config;
mod error;
pub mod event;
pub mod pool;
pub mod sync_engine;
pub mod transport;
pub mod types;
pub mod websocket;

pub use config::{APP_DATA_KIND, DEFAULT_RELAYS, RelayConfig};
pub use error::{RelayError, RelayResult};
pub use event::{address_for, compute_id, parse_address, record_event};
pub use pool::RelayPool;
pub use sync_engine::RelaySync;
pub use transport::RelayConnection;
pub use types::{ClientMessage, Filter, PublishReport, RelayEvent, RelayMessage};
pub use websocket::WebSocketRelay;
