//! SQLite backend (feature `sqlite`).
//!
//! Creates a single `cache.db` file in the configured directory with one
//! `kv` table.  The connection is guarded by a mutex; `busy_timeout` bounds
//! how long a write can stall the caller when another process holds the
//! database lock.

use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension};

use crate::{CacheError, CacheResult, KeyValueStore};

/// Default upper bound on how long a statement waits for a locked database.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(250);

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) `cache.db` in `dir` and initialise the schema.
    pub fn new(dir: &Path) -> CacheResult<Self> {
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join("cache.db"))?;
        Self::init(conn, DEFAULT_BUSY_TIMEOUT)
    }

    /// An in-memory database; contents vanish with the store.
    pub fn in_memory() -> CacheResult<Self> {
        Self::init(Connection::open_in_memory()?, DEFAULT_BUSY_TIMEOUT)
    }

    /// Override the lock wait bound.
    pub fn with_busy_timeout(self, timeout: Duration) -> CacheResult<Self> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Poisoned)?
            .busy_timeout(timeout)?;
        Ok(self)
    }

    fn init(conn: Connection, timeout: Duration) -> CacheResult<Self> {
        conn.busy_timeout(timeout)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS kv (
                 key        TEXT PRIMARY KEY,
                 value      TEXT NOT NULL,
                 updated_at INTEGER NOT NULL
             );",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value, unix_secs()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> CacheResult<()> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

fn unix_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
