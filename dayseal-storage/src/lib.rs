//! DuckDB storage layer for dayseal.
//!
//! Persists sealed daily records, the sealed identity, temporary goal
//! definitions and sync metadata. Nothing here decrypts anything: records
//! arrive sealed and leave sealed.
//!
//! # Architecture
//!
//! - `records` is keyed by the `YYYY-MM-DD` date string; range scans use
//!   plain string comparison, which matches chronological order.
//! - `identity` holds at most one row, keyed by `"primary"`.
//! - `temp_goals` stores each definition as JSON keyed by its slug.
//! - `sync_meta` holds the last sync timestamp as a singleton row.
//!
//! Every write is an upsert (`INSERT OR REPLACE`). The connection sits
//! behind a mutex, so concurrent in-process callers are serialized per
//! statement.

mod error;
mod local_store;

pub use error::{StorageError, StorageResult};
pub use local_store::LocalStore;

use std::path::Path;
use tracing::error;

/// Open a DuckDB connection, recovering from a WAL that cannot be replayed.
///
/// Only a failed WAL replay takes the recovery path: the `.wal` file is
/// moved aside to `<name>.wal.corrupt` and the open is retried once. Any
/// other failure, including a lock held by another process, is returned
/// untouched and the WAL is left in place.
pub fn open_duckdb_with_wal_recovery(path: &Path) -> StorageResult<duckdb::Connection> {
    match duckdb::Connection::open(path) {
        Ok(conn) => Ok(conn),
        Err(first_err) => {
            let wal_path = path.with_extension(
                path.extension()
                    .map(|ext| format!("{}.wal", ext.to_string_lossy()))
                    .unwrap_or_else(|| "wal".to_string()),
            );
            if !wal_path.exists() || !is_wal_replay_failure(&first_err.to_string()) {
                return Err(first_err.into());
            }
            let aside = wal_path.with_extension("wal.corrupt");
            error!(
                wal = %wal_path.display(),
                moved_to = %aside.display(),
                "WAL replay failed: {first_err}; moving WAL aside and retrying"
            );
            std::fs::rename(&wal_path, &aside)?;
            Ok(duckdb::Connection::open(path)?)
        }
    }
}

fn is_wal_replay_failure(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    let lock_conflict = message.contains("could not set lock") || message.contains("conflicting lock");
    !lock_conflict && (message.contains("replaying wal") || message.contains("wal replay"))
}
