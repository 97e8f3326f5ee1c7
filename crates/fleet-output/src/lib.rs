//! `fleet-output` — writes fleet snapshots to disk as they are published.
//!
//! | Feature   | Backend | Files created                                   |
//! |-----------|---------|-------------------------------------------------|
//! | *(none)*  | CSV     | `driver_snapshots.csv`, `tick_summaries.csv`    |
//! | `sqlite`  | SQLite  | `output.db`                                     |
//!
//! All backends implement [`OutputWriter`] and are driven by
//! [`SnapshotExporter`], which implements `fleet_sim::FleetSubscriber`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fleet_output::{CsvWriter, SnapshotExporter};
//!
//! let exporter = SnapshotExporter::new(CsvWriter::new(Path::new("./output"))?, 1);
//! engine.subscribe(exporter.clone()).detach();
//! engine.connect();
//! // …
//! engine.disconnect();
//! exporter.finish()?;
//! ```

pub mod csv;
pub mod error;
pub mod exporter;
pub mod row;
pub mod writer;

#[cfg(feature = "sqlite")]
pub mod sqlite;


pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use exporter::SnapshotExporter;
pub use row::{DriverSnapshotRow, TickSummaryRow};
pub use writer::OutputWriter;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteWriter;
