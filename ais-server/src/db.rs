//! SQLite identity store — WAL mode, one `vessels` table keyed by MMSI.
//!
//! The upsert runs in a single transaction and returns the merged row
//! via `RETURNING`; any failure rolls the transaction back, so a
//! partial write is never visible.

use std::path::Path;

use rusqlite::{params, Connection};
use serde::Serialize;

use ais_core::identity::{IdentityStore, StaticFacts};
use ais_core::report::StaticFields;
use ais_core::types::{Mmsi, StorageError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS vessels (
    mmsi TEXT PRIMARY KEY,
    imo TEXT,
    name TEXT,
    callsign TEXT,
    type INTEGER,
    bow INTEGER,
    stern INTEGER,
    port INTEGER,
    starboard INTEGER,
    first_sight INTEGER,
    last_sight INTEGER
);

CREATE INDEX IF NOT EXISTS idx_vessels_last_sight ON vessels(last_sight);
"#;

const RETURNING: &str = "RETURNING mmsi, imo, name, callsign, type, bow, stern, port, starboard, first_sight, last_sight";

fn backend(e: rusqlite::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// Durable vessel identity store backed by SQLite.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory().map_err(backend)?
        } else {
            if let Some(parent) = Path::new(path).parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            Connection::open(path).map_err(backend)?
        };

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(backend)?;
        conn.execute_batch(SCHEMA).map_err(backend)?;

        Ok(SqliteStore { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self, StorageError> {
        Self::open(":memory:")
    }

    /// Fetch one stored vessel, if present.
    pub fn get_vessel(&self, mmsi: Mmsi) -> Result<Option<StaticFacts>, StorageError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT mmsi, imo, name, callsign, type, bow, stern, port, starboard,
                        first_sight, last_sight
                 FROM vessels WHERE mmsi = ?1",
            )
            .map_err(backend)?;
        let mut rows = stmt
            .query_map(params![mmsi.to_string()], row_to_facts)
            .map_err(backend)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(backend)?)),
            None => Ok(None),
        }
    }

    pub fn stats(&self) -> Result<StoreStats, StorageError> {
        self.conn
            .query_row(
                "SELECT COUNT(*), MIN(first_sight), MAX(last_sight) FROM vessels",
                [],
                |r| {
                    Ok(StoreStats {
                        vessels: r.get(0)?,
                        earliest_sight: r.get(1)?,
                        latest_sight: r.get(2)?,
                    })
                },
            )
            .map_err(backend)
    }
}

/// Summary counts for the `stats` subcommand.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub vessels: i64,
    pub earliest_sight: Option<i64>,
    pub latest_sight: Option<i64>,
}

impl IdentityStore for SqliteStore {
    fn upsert(
        &mut self,
        fields: &StaticFields,
        allow_full_update: bool,
        now: i64,
    ) -> Result<StaticFacts, StorageError> {
        // Insert values carry the column defaults for absent type-5
        // fields.
        let resolved = StaticFacts::from_fields(fields, now);

        let sql = if allow_full_update {
            format!(
                "INSERT INTO vessels (mmsi, imo, name, callsign, type, bow, stern, port, starboard, first_sight, last_sight)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
                 ON CONFLICT(mmsi) DO UPDATE SET
                     imo = excluded.imo,
                     name = excluded.name,
                     callsign = excluded.callsign,
                     type = excluded.type,
                     bow = excluded.bow,
                     stern = excluded.stern,
                     port = excluded.port,
                     starboard = excluded.starboard,
                     last_sight = excluded.last_sight
                 {RETURNING}"
            )
        } else {
            format!(
                "INSERT INTO vessels (mmsi, imo, name, callsign, type, bow, stern, port, starboard, first_sight, last_sight)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
                 ON CONFLICT(mmsi) DO UPDATE SET
                     last_sight = excluded.last_sight
                 {RETURNING}"
            )
        };

        let tx = self.conn.transaction().map_err(backend)?;
        let row = tx
            .query_row(
                &sql,
                params![
                    resolved.mmsi.to_string(),
                    resolved.imo,
                    resolved.name,
                    resolved.callsign,
                    resolved.ship_type,
                    resolved.to_bow,
                    resolved.to_stern,
                    resolved.to_port,
                    resolved.to_starboard,
                    now,
                ],
                row_to_facts,
            )
            .map_err(backend)?;
        tx.commit().map_err(backend)?;
        Ok(row)
    }
}

fn row_to_facts(r: &rusqlite::Row<'_>) -> rusqlite::Result<StaticFacts> {
    let mmsi_text: String = r.get(0)?;
    let mmsi: Mmsi = mmsi_text.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(StaticFacts {
        mmsi,
        imo: r.get(1)?,
        name: r.get(2)?,
        callsign: r.get(3)?,
        ship_type: r.get(4)?,
        to_bow: r.get(5)?,
        to_stern: r.get(6)?,
        to_port: r.get(7)?,
        to_starboard: r.get(8)?,
        first_sight: r.get(9)?,
        last_sight: r.get(10)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
