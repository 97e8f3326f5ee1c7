//! `SnapshotExporter<W>` — bridges `FleetSubscriber` to an `OutputWriter`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fleet_sim::{FleetSubscriber, Snapshot, SubscriberError, SubscriberResult};

use crate::row::{DriverSnapshotRow, TickSummaryRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

struct ExporterState<W> {
    writer:        W,
    last_tick:     Option<u64>,
    ticks_written: u64,
    first_error:   Option<OutputError>,
}

/// A [`FleetSubscriber`] that writes driver rows and a tick summary for
/// every `interval`-th tick to any [`OutputWriter`] backend.
///
/// The exporter is a cheap handle: subscribe one clone and keep another to
/// call [`take_error`](Self::take_error) and [`finish`](Self::finish) once
/// the engine is disconnected.
///
/// A snapshot whose tick has already been written (the engine re-delivers
/// the seeded population on `connect`) is skipped.
pub struct SnapshotExporter<W> {
    state:    Arc<Mutex<ExporterState<W>>>,
    interval: u64,
}

impl<W> Clone for SnapshotExporter<W> {
    fn clone(&self) -> Self {
        Self { state: Arc::clone(&self.state), interval: self.interval }
    }
}

impl<W: OutputWriter> SnapshotExporter<W> {
    /// Create an exporter backed by `writer`.  An `interval` of 0 is treated
    /// as 1.
    pub fn new(writer: W, interval: u64) -> Self {
        let state = ExporterState { writer, last_tick: None, ticks_written: 0, first_error: None };
        Self { state: Arc::new(Mutex::new(state)), interval: interval.max(1) }
    }

    /// Take the stored write error (if any).
    ///
    /// Returns `None` if all writes succeeded.
    pub fn take_error(&self) -> Option<OutputError> {
        self.lock().first_error.take()
    }

    pub fn ticks_written(&self) -> u64 {
        self.lock().ticks_written
    }

    /// Flush and close the backend.  Later snapshots fail with
    /// [`OutputError::Finished`].
    pub fn finish(&self) -> OutputResult<()> {
        self.lock().writer.finish()
    }

    fn lock(&self) -> MutexGuard<'_, ExporterState<W>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn export(state: &mut ExporterState<W>, snapshot: &Snapshot) -> OutputResult<()> {
        let rows: Vec<DriverSnapshotRow> = snapshot
            .drivers
            .iter()
            .map(|d| DriverSnapshotRow::from_driver(d, snapshot.tick))
            .collect();
        if !rows.is_empty() {
            state.writer.write_drivers(&rows)?;
        }
        state.writer.write_tick_summary(&TickSummaryRow::from_snapshot(snapshot))
    }
}

impl<W: OutputWriter + 'static> FleetSubscriber for SnapshotExporter<W> {
    fn on_snapshot(&self, snapshot: &Snapshot) -> SubscriberResult {
        if snapshot.tick % self.interval != 0 {
            return Ok(());
        }
        let mut state = self.lock();
        if state.last_tick == Some(snapshot.tick) {
            return Ok(());
        }
        state.last_tick = Some(snapshot.tick);

        match Self::export(&mut state, snapshot) {
            Ok(()) => {
                state.ticks_written += 1;
                Ok(())
            }
            Err(e) => {
                let reported = SubscriberError::msg(e.to_string());
                // Keep only the first error.
                if state.first_error.is_none() {
                    state.first_error = Some(e);
                }
                Err(reported)
            }
        }
    }
}
