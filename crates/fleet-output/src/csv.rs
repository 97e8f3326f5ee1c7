//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `driver_snapshots.csv`
//! - `tick_summaries.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{DriverSnapshotRow, OutputError, OutputResult, TickSummaryRow};

pub const DRIVER_HEADERS: [&str; 7] =
    ["driver_id", "tick", "lat", "lon", "status", "speed_kmh", "history_len"];

pub const SUMMARY_HEADERS: [&str; 5] = ["tick", "unix_ms", "active", "idle", "offline"];

/// Writes snapshot output to two CSV files.
pub struct CsvWriter {
    drivers:   Writer<File>,
    summaries: Writer<File>,
    finished:  bool,
}

impl CsvWriter {
    /// Create `dir` if needed, open the two CSV files, and write the header
    /// rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        std::fs::create_dir_all(dir)?;

        let mut drivers = Writer::from_path(dir.join("driver_snapshots.csv"))?;
        drivers.write_record(DRIVER_HEADERS)?;

        let mut summaries = Writer::from_path(dir.join("tick_summaries.csv"))?;
        summaries.write_record(SUMMARY_HEADERS)?;

        Ok(Self { drivers, summaries, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_drivers(&mut self, rows: &[DriverSnapshotRow]) -> OutputResult<()> {
        if self.finished {
            return Err(OutputError::Finished);
        }
        for row in rows {
            self.drivers.write_record(&[
                row.driver_id.to_string(),
                row.tick.to_string(),
                format!("{:.6}", row.lat),
                format!("{:.6}", row.lon),
                row.status.as_str().to_owned(),
                row.speed_kmh.to_string(),
                row.history_len.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()> {
        if self.finished {
            return Err(OutputError::Finished);
        }
        self.summaries.write_record(&[
            row.tick.to_string(),
            row.unix_ms.to_string(),
            row.active.to_string(),
            row.idle.to_string(),
            row.offline.to_string(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.drivers.flush()?;
        self.summaries.flush()?;
        Ok(())
    }
}
