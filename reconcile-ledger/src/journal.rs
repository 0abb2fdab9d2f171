//! Persistent mirror of the registry's global resolution log.
//!
//! Uses its own SQLite file; rows are inserted once and never updated.

use crate::error::{LedgerError, LedgerResult};
use reconcile_types::{Digest, Identity, ResolutionRecord, Timestamp, Winner};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// A journaled record with its global id and the strategy id it was routed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub id: u64,
    pub route: String,
    pub record: ResolutionRecord,
}

/// Append-only resolution journal backed by SQLite.
pub struct JournalStore {
    conn: Mutex<Connection>,
}

type RawRow = (
    i64,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
    bool,
    String,
    Vec<u8>,
);

impl JournalStore {
    /// Opens (or creates) a journal at the given path.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| LedgerError::Storage(format!("failed to open journal: {e}")))?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;
        Ok(store)
    }

    /// Opens an in-memory journal (for testing).
    pub fn open_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| LedgerError::Storage(format!("failed to open in-memory journal: {e}")))?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;
        Ok(store)
    }

    fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn init_schema(&self) -> LedgerResult<()> {
        let conn = self.connection();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS resolutions (
                id INTEGER PRIMARY KEY,
                route TEXT NOT NULL,
                entity TEXT NOT NULL,
                strategy TEXT NOT NULL,
                winner TEXT NOT NULL,
                version_a TEXT NOT NULL,
                version_b TEXT NOT NULL,
                ancestor TEXT NOT NULL,
                merged TEXT NOT NULL,
                resolved_at INTEGER NOT NULL,
                resolved_by TEXT NOT NULL,
                auto_resolved INTEGER NOT NULL,
                details TEXT NOT NULL,
                extra_data BLOB NOT NULL
            );

            CREATE INDEX IF NOT EXISTS resolutions_entity ON resolutions (entity);
            ",
        )
        .map_err(|e| LedgerError::Storage(format!("failed to init journal schema: {e}")))?;
        Ok(())
    }

    /// Appends a record under its global id. Fails if the id was already used.
    pub fn append(&self, id: u64, route: &str, record: &ResolutionRecord) -> LedgerResult<()> {
        let conn = self.connection();
        conn.execute(
            "INSERT INTO resolutions (id, route, entity, strategy, winner, version_a, version_b, ancestor, merged, resolved_at, resolved_by, auto_resolved, details, extra_data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                id as i64,
                route,
                record.entity_id.to_hex(),
                record.strategy,
                record.winner.as_str(),
                record.version_a_hash.to_hex(),
                record.version_b_hash.to_hex(),
                record.ancestor_hash.to_hex(),
                record.merged_hash.to_hex(),
                record.resolved_at.as_secs() as i64,
                record.resolved_by.to_string(),
                record.auto_resolved,
                record.details,
                record.extra_data,
            ],
        )
        .map_err(|e| LedgerError::Storage(format!("failed to append resolution {id}: {e}")))?;
        Ok(())
    }

    /// Loads every entry in id order.
    pub fn load_all(&self) -> LedgerResult<Vec<JournalEntry>> {
        let conn = self.connection();
        let mut stmt = conn
            .prepare(
                "SELECT id, route, entity, strategy, winner, version_a, version_b, ancestor, merged, resolved_at, resolved_by, auto_resolved, details, extra_data
                 FROM resolutions ORDER BY id ASC",
            )
            .map_err(|e| LedgerError::Storage(format!("failed to prepare journal query: {e}")))?;

        let rows = stmt
            .query_map([], |row| -> rusqlite::Result<RawRow> {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                    row.get(9)?,
                    row.get(10)?,
                    row.get(11)?,
                    row.get(12)?,
                    row.get(13)?,
                ))
            })
            .map_err(|e| LedgerError::Storage(format!("failed to query journal: {e}")))?;

        let mut entries = Vec::new();
        for row in rows {
            let raw = row.map_err(|e| LedgerError::Storage(format!("failed to read journal row: {e}")))?;
            entries.push(parse_row(raw)?);
        }
        Ok(entries)
    }

    /// Number of journaled records.
    pub fn count(&self) -> LedgerResult<u64> {
        let conn = self.connection();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM resolutions", [], |row| row.get(0))
            .map_err(|e| LedgerError::Storage(format!("failed to count journal: {e}")))?;
        Ok(count as u64)
    }

    /// Global ids journaled for an entity, in id order.
    pub fn entity_ids(&self, entity_id: &Digest) -> LedgerResult<Vec<u64>> {
        let conn = self.connection();
        let mut stmt = conn
            .prepare("SELECT id FROM resolutions WHERE entity = ?1 ORDER BY id ASC")
            .map_err(|e| LedgerError::Storage(format!("failed to prepare entity query: {e}")))?;
        let ids = stmt
            .query_map(params![entity_id.to_hex()], |row| row.get::<_, i64>(0))
            .map_err(|e| LedgerError::Storage(format!("failed to query entity history: {e}")))?
            .map(|r| r.map(|id| id as u64))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| LedgerError::Storage(format!("failed to read entity history: {e}")))?;
        Ok(ids)
    }
}

fn parse_digest(column: &str, value: &str) -> LedgerResult<Digest> {
    Digest::from_hex(value).map_err(|e| LedgerError::Storage(format!("invalid {column} in journal: {e}")))
}

fn parse_row(raw: RawRow) -> LedgerResult<JournalEntry> {
    let (id, route, entity, strategy, winner, version_a, version_b, ancestor, merged, resolved_at, resolved_by, auto_resolved, details, extra_data) =
        raw;

    let winner: Winner = winner
        .parse()
        .map_err(|e: String| LedgerError::Storage(format!("invalid winner in journal: {e}")))?;
    let resolved_by: Identity = resolved_by
        .parse()
        .map_err(|e| LedgerError::Storage(format!("invalid resolved_by in journal: {e}")))?;

    Ok(JournalEntry {
        id: id as u64,
        route,
        record: ResolutionRecord {
            entity_id: parse_digest("entity", &entity)?,
            strategy,
            winner,
            version_a_hash: parse_digest("version_a", &version_a)?,
            version_b_hash: parse_digest("version_b", &version_b)?,
            ancestor_hash: parse_digest("ancestor", &ancestor)?,
            merged_hash: parse_digest("merged", &merged)?,
            resolved_at: Timestamp::from_secs(resolved_at as u64),
            resolved_by,
            auto_resolved,
            details,
            extra_data,
        },
    })
}
