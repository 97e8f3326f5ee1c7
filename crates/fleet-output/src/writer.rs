//! The `OutputWriter` trait implemented by all backend writers.

use crate::{DriverSnapshotRow, OutputResult, TickSummaryRow};

/// Trait implemented by the CSV and SQLite writers.
pub trait OutputWriter: Send {
    /// Write one tick's worth of driver rows.
    fn write_drivers(&mut self, rows: &[DriverSnapshotRow]) -> OutputResult<()>;

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent.
    fn finish(&mut self) -> OutputResult<()>;
}
