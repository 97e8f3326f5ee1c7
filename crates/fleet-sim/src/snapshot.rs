//! Immutable population snapshots handed to subscribers.

use std::sync::Arc;

use fleet_core::{Driver, DriverId, DriverStatus, Timestamp};

/// The full population as of one tick.
///
/// Cloning is cheap (the driver slice is shared), and nothing can mutate a
/// snapshot once it has been published, so readers may hold on to it or
/// filter it from any thread without locking.
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// Tick counter at publication; 0 for the seeded population.
    pub tick:     u64,
    pub taken_at: Timestamp,
    pub drivers:  Arc<[Driver]>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self { tick: 0, taken_at: Timestamp::EPOCH, drivers: Arc::from(Vec::new()) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// Linear lookup.  Prefer `FleetEngine::get_by_id` for the live population.
    pub fn find(&self, id: DriverId) -> Option<&Driver> {
        self.drivers.iter().find(|d| d.id == id)
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for driver in self.drivers.iter() {
            match driver.status {
                DriverStatus::Active  => counts.active += 1,
                DriverStatus::Idle    => counts.idle += 1,
                DriverStatus::Offline => counts.offline += 1,
                DriverStatus::Unknown => counts.unknown += 1,
            }
        }
        counts
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub active:  usize,
    pub idle:    usize,
    pub offline: usize,
    pub unknown: usize,
}
