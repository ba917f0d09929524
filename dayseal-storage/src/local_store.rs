//! Local keyed store backed by DuckDB.

use crate::error::{StorageError, StorageResult};
use dayseal_types::{
    IDENTITY_RECORD_ID, RecordDate, SealedIdentity, SealedRecord, SyncMeta, TempGoalDef,
};
use duckdb::{Connection, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

const SYNC_META_ID: &str = "sync";

/// Keyed store for sealed records, the sealed identity, temporary goal
/// definitions and sync metadata.
///
/// Cloning is cheap and shares the underlying connection.
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStore {
    /// Opens or creates a store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = crate::open_duckdb_with_wal_recovery(path)?;
        initialize_schema(&conn)?;
        debug!(path = %path.display(), "opened local store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock_conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    // ── Sealed records ──────────────────────────────────────────

    /// Upserts a sealed record; an existing record for the date is replaced.
    pub fn put_record(&self, record: &SealedRecord) -> StorageResult<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO records (date, ciphertext) VALUES (?, ?)",
            params![record.date.to_string(), record.ciphertext],
        )?;
        Ok(())
    }

    /// Upserts many records in one transaction.
    pub fn put_records(&self, records: &[SealedRecord]) -> StorageResult<usize> {
        let conn = self.lock_conn()?;
        conn.execute_batch("BEGIN TRANSACTION")?;
        for record in records {
            if let Err(e) = conn.execute(
                "INSERT OR REPLACE INTO records (date, ciphertext) VALUES (?, ?)",
                params![record.date.to_string(), record.ciphertext],
            ) {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(e.into());
            }
        }
        conn.execute_batch("COMMIT")?;
        Ok(records.len())
    }

    pub fn get_record(&self, date: RecordDate) -> StorageResult<Option<SealedRecord>> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            "SELECT date, ciphertext FROM records WHERE date = ?",
            params![date.to_string()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        );
        match result {
            Ok(row) => Ok(Some(sealed_from_row(row)?)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Records with `start <= date <= end`, ordered by date. Empty when
    /// `start > end`. Rows with a malformed key are skipped.
    pub fn records_in_range(
        &self,
        start: RecordDate,
        end: RecordDate,
    ) -> StorageResult<Vec<SealedRecord>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT date, ciphertext FROM records WHERE date >= ? AND date <= ? ORDER BY date",
        )?;
        let rows = stmt
            .query_map(params![start.to_string(), end.to_string()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sealed_rows(rows))
    }

    /// Every record, ordered by date. Rows with a malformed key are skipped.
    pub fn all_records(&self) -> StorageResult<Vec<SealedRecord>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT date, ciphertext FROM records ORDER BY date")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sealed_rows(rows))
    }

    pub fn count_records(&self) -> StorageResult<usize> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Returns whether a record existed.
    pub fn delete_record(&self, date: RecordDate) -> StorageResult<bool> {
        let conn = self.lock_conn()?;
        let affected = conn.execute(
            "DELETE FROM records WHERE date = ?",
            params![date.to_string()],
        )?;
        Ok(affected > 0)
    }

    // ── Sealed identity ─────────────────────────────────────────

    /// Stores the sealed identity, replacing any previous one.
    pub fn put_identity(&self, identity: &SealedIdentity) -> StorageResult<()> {
        if identity.id != IDENTITY_RECORD_ID {
            return Err(StorageError::InvalidData(format!(
                "identity id must be {IDENTITY_RECORD_ID:?}, got {:?}",
                identity.id
            )));
        }
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO identity (id, encrypted_secret, salt, iv, public_id)
             VALUES (?, ?, ?, ?, ?)",
            params![
                identity.id,
                identity.encrypted_secret,
                identity.salt,
                identity.iv,
                identity.public_id,
            ],
        )?;
        Ok(())
    }

    pub fn get_identity(&self) -> StorageResult<Option<SealedIdentity>> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            "SELECT id, encrypted_secret, salt, iv, public_id FROM identity WHERE id = ?",
            params![IDENTITY_RECORD_ID],
            |row| {
                Ok(SealedIdentity {
                    id: row.get(0)?,
                    encrypted_secret: row.get(1)?,
                    salt: row.get(2)?,
                    iv: row.get(3)?,
                    public_id: row.get(4)?,
                })
            },
        );
        match result {
            Ok(identity) => Ok(Some(identity)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn has_identity(&self) -> StorageResult<bool> {
        Ok(self.get_identity()?.is_some())
    }

    /// Deletes the sealed identity together with every sealed record.
    ///
    /// Records are useless without the key, so they go in the same
    /// transaction rather than being left behind as orphans.
    pub fn delete_identity(&self) -> StorageResult<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch("BEGIN TRANSACTION")?;
        let result = conn.execute_batch(
            "DELETE FROM identity;
             DELETE FROM records;",
        );
        match result {
            Ok(()) => {
                conn.execute_batch("COMMIT")?;
                Ok(())
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e.into())
            }
        }
    }

    // ── Temporary goal definitions ──────────────────────────────

    /// Upserts a goal definition keyed by its id.
    pub fn put_temp_goal(&self, goal: &TempGoalDef) -> StorageResult<()> {
        goal.validate()?;
        let data_json = serde_json::to_string(goal)?;
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO temp_goals (id, data_json) VALUES (?, ?)",
            params![goal.id, data_json],
        )?;
        Ok(())
    }

    pub fn get_temp_goal(&self, id: &str) -> StorageResult<Option<TempGoalDef>> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            "SELECT data_json FROM temp_goals WHERE id = ?",
            params![id],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All goal definitions, ordered by creation date then id.
    pub fn temp_goals(&self) -> StorageResult<Vec<TempGoalDef>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT data_json FROM temp_goals")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        let mut goals = rows
            .iter()
            .map(|json| serde_json::from_str::<TempGoalDef>(json))
            .collect::<Result<Vec<_>, _>>()?;
        goals.sort_by(|a, b| {
            a.created_date
                .cmp(&b.created_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(goals)
    }

    /// Removes a goal definition. Answers already stored in records stay.
    pub fn delete_temp_goal(&self, id: &str) -> StorageResult<bool> {
        let conn = self.lock_conn()?;
        let affected = conn.execute("DELETE FROM temp_goals WHERE id = ?", params![id])?;
        Ok(affected > 0)
    }

    // ── Sync metadata ───────────────────────────────────────────

    pub fn get_sync_meta(&self) -> StorageResult<Option<SyncMeta>> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            "SELECT last_sync_time FROM sync_meta WHERE id = ?",
            params![SYNC_META_ID],
            |row| row.get::<_, i64>(0),
        );
        match result {
            Ok(last_sync_time) => Ok(Some(SyncMeta { last_sync_time })),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_sync_meta(&self, meta: SyncMeta) -> StorageResult<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO sync_meta (id, last_sync_time) VALUES (?, ?)",
            params![SYNC_META_ID, meta.last_sync_time],
        )?;
        Ok(())
    }
}

fn sealed_from_row((date, ciphertext): (String, String)) -> StorageResult<SealedRecord> {
    let date = RecordDate::parse(&date)
        .map_err(|_| StorageError::InvalidData(format!("stored record key {date:?}")))?;
    Ok(SealedRecord { date, ciphertext })
}

/// Keeps the rows with a parseable key.
fn sealed_rows(rows: Vec<(String, String)>) -> Vec<SealedRecord> {
    rows.into_iter()
        .filter_map(|row| match sealed_from_row(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("skipping stored record: {e}");
                None
            }
        })
        .collect()
}

fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS records (
            date VARCHAR PRIMARY KEY,
            ciphertext VARCHAR NOT NULL
        );
        CREATE TABLE IF NOT EXISTS identity (
            id VARCHAR PRIMARY KEY,
            encrypted_secret VARCHAR NOT NULL,
            salt VARCHAR NOT NULL,
            iv VARCHAR NOT NULL,
            public_id VARCHAR NOT NULL
        );
        CREATE TABLE IF NOT EXISTS temp_goals (
            id VARCHAR PRIMARY KEY,
            data_json VARCHAR NOT NULL
        );
        CREATE TABLE IF NOT EXISTS sync_meta (
            id VARCHAR PRIMARY KEY,
            last_sync_time BIGINT NOT NULL
        );",
    )?;
    Ok(())
}
