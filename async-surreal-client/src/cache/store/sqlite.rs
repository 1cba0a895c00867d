// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! Embedded SQL cache storage, persisted across process restarts.
//!
//! Table membership is matched against the CSV `tables` column with four
//! anchored patterns (exact, prefix, middle, suffix). That is sound
//! because table names are validated identifiers and can never contain
//! commas.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use surreal_core::sync::Mutex;
use surreal_types::{Error, Result, Value};

use super::CacheStore;
use crate::cache::{CacheEntry, CacheKey};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cache_entries (
    key              TEXT PRIMARY KEY,
    method           TEXT NOT NULL,
    target           TEXT NOT NULL,
    params_hash      TEXT NOT NULL,
    value            BLOB NOT NULL,
    tables           TEXT NOT NULL,
    created_at       REAL NOT NULL,
    last_accessed_at REAL NOT NULL,
    access_count     INTEGER NOT NULL,
    ttl              REAL
);
CREATE INDEX IF NOT EXISTS idx_cache_entries_tables
    ON cache_entries (tables);
CREATE INDEX IF NOT EXISTS idx_cache_entries_last_accessed
    ON cache_entries (last_accessed_at);
";

fn store_err(e: rusqlite::Error) -> Error {
    Error::connection(format!("sqlite cache store: {e}"))
}

fn timestamp_to_f64(t: DateTime<Utc>) -> f64 {
    t.timestamp_micros() as f64 / 1_000_000.0
}

fn f64_to_timestamp(secs: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros((secs * 1_000_000.0) as i64).unwrap_or_default()
}

/// A cache store backed by an embedded SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(store_err)?;
        Self::init(conn)
    }

    /// Open a store that lives only in memory. Useful for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(store_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<(CacheKey, CacheEntry)> {
    let method: String = row.get("method")?;
    let target: String = row.get("target")?;
    let params_hash: String = row.get("params_hash")?;
    let value: Vec<u8> = row.get("value")?;
    let tables: String = row.get("tables")?;
    let created_at: f64 = row.get("created_at")?;
    let last_accessed_at: f64 = row.get("last_accessed_at")?;
    let access_count: i64 = row.get("access_count")?;
    let ttl: Option<f64> = row.get("ttl")?;

    let value = surreal_types::binary::parse_binary(&value).unwrap_or(Value::None);
    let tables = if tables.is_empty() {
        Vec::new()
    } else {
        tables.split(',').map(str::to_string).collect()
    };
    Ok((
        CacheKey {
            method,
            target,
            params_hash,
        },
        CacheEntry {
            value,
            tables,
            created_at: f64_to_timestamp(created_at),
            last_accessed_at: f64_to_timestamp(last_accessed_at),
            access_count: access_count.max(0) as u64,
            ttl: ttl.map(Duration::from_secs_f64),
        },
    ))
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT * FROM cache_entries WHERE key = ?1",
            params![key.storage_key()],
            |row| row_to_entry(row).map(|(_, entry)| entry),
        )
        .optional()
        .map_err(store_err)
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> Result<()> {
        let value = surreal_types::binary::serialize_binary(&entry.value)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries
             (key, method, target, params_hash, value, tables,
              created_at, last_accessed_at, access_count, ttl)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                key.storage_key(),
                key.method,
                key.target,
                key.params_hash,
                value,
                entry.tables.join(","),
                timestamp_to_f64(entry.created_at),
                timestamp_to_f64(entry.last_accessed_at),
                entry.access_count as i64,
                entry.ttl.map(|t| t.as_secs_f64()),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM cache_entries WHERE key = ?1",
            params![key.storage_key()],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn remove_all(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM cache_entries", [])
            .map_err(store_err)?;
        Ok(())
    }

    async fn remove_entries_for_table(&self, table: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM cache_entries
             WHERE tables = ?1
                OR tables LIKE ?1 || ',%'
                OR tables LIKE '%,' || ?1 || ',%'
                OR tables LIKE '%,' || ?1",
            params![table],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn all_entries(&self) -> Result<Vec<(CacheKey, CacheEntry)>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT * FROM cache_entries ORDER BY last_accessed_at ASC")
            .map_err(store_err)?;
        let rows = stmt.query_map([], row_to_entry).map_err(store_err)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(store_err)?);
        }
        Ok(entries)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
            .map_err(store_err)?;
        Ok(count.max(0) as usize)
    }
}
