//! SQLite output backend (feature `sqlite`).
//!
//! Creates a single `output.db` file in the configured output directory with
//! two tables: `driver_snapshots` and `tick_summaries`.

use std::path::Path;

use rusqlite::Connection;

use crate::writer::OutputWriter;
use crate::{DriverSnapshotRow, OutputError, OutputResult, TickSummaryRow};

/// Writes snapshot output to an SQLite database.
pub struct SqliteWriter {
    conn:     Connection,
    finished: bool,
}

impl SqliteWriter {
    /// Open (or create) `output.db` in `dir` and initialise the schema.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join("output.db"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS driver_snapshots (
                 driver_id   INTEGER NOT NULL,
                 tick        INTEGER NOT NULL,
                 lat         REAL    NOT NULL,
                 lon         REAL    NOT NULL,
                 status      TEXT    NOT NULL,
                 speed_kmh   INTEGER NOT NULL,
                 history_len INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS tick_summaries (
                 tick    INTEGER PRIMARY KEY,
                 unix_ms INTEGER NOT NULL,
                 active  INTEGER NOT NULL,
                 idle    INTEGER NOT NULL,
                 offline INTEGER NOT NULL
             );",
        )?;

        Ok(Self { conn, finished: false })
    }
}

impl OutputWriter for SqliteWriter {
    fn write_drivers(&mut self, rows: &[DriverSnapshotRow]) -> OutputResult<()> {
        if self.finished {
            return Err(OutputError::Finished);
        }
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO driver_snapshots \
                 (driver_id, tick, lat, lon, status, speed_kmh, history_len) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.driver_id,
                    row.tick as i64,
                    row.lat,
                    row.lon,
                    row.status.as_str(),
                    row.speed_kmh,
                    row.history_len,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()> {
        if self.finished {
            return Err(OutputError::Finished);
        }
        self.conn.execute(
            "INSERT OR REPLACE INTO tick_summaries (tick, unix_ms, active, idle, offline) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                row.tick as i64,
                row.unix_ms,
                row.active as i64,
                row.idle as i64,
                row.offline as i64,
            ],
        )?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
