//! Plain data row types written by output backends.

use fleet_core::{Driver, DriverStatus};
use fleet_sim::Snapshot;

/// One driver as of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverSnapshotRow {
    pub driver_id:   u32,
    pub tick:        u64,
    pub lat:         f64,
    pub lon:         f64,
    pub status:      DriverStatus,
    pub speed_kmh:   u32,
    pub history_len: u32,
}

impl DriverSnapshotRow {
    pub fn from_driver(driver: &Driver, tick: u64) -> Self {
        Self {
            driver_id:   driver.id.0,
            tick,
            lat:         driver.point.lat,
            lon:         driver.point.lon,
            status:      driver.status,
            speed_kmh:   driver.speed_kmh,
            history_len: driver.history.len() as u32,
        }
    }
}

/// Status totals for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummaryRow {
    pub tick:    u64,
    /// Publication time, Unix milliseconds.
    pub unix_ms: i64,
    pub active:  u64,
    pub idle:    u64,
    pub offline: u64,
}

impl TickSummaryRow {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let counts = snapshot.status_counts();
        Self {
            tick:    snapshot.tick,
            unix_ms: snapshot.taken_at.as_millis(),
            active:  counts.active as u64,
            idle:    counts.idle as u64,
            offline: counts.offline as u64,
        }
    }
}
