//! The fleet cache record.
//!
//! Every failure here is transient: it is logged and reported to the caller
//! as "nothing restored" or "not persisted", never as an error, so neither
//! `connect` nor a tick can be interrupted by storage trouble.

use std::sync::Arc;
use std::time::Duration;

use fleet_cache::{CacheRecord, CacheResult, KeyValueStore, TypedCache};
use fleet_core::{Driver, HISTORY_CAP, Timestamp};
use tracing::{debug, info, warn};

/// Store key of the fleet snapshot record.
pub const FLEET_CACHE_KEY: &str = "driver_positions_cache";

#[derive(Clone)]
pub struct FleetCache {
    inner: TypedCache<Vec<Driver>>,
}

impl FleetCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { inner: TypedCache::new(store, FLEET_CACHE_KEY) }
    }

    /// The stored population if it is non-empty and no older than `window`.
    /// Each driver's history is cut to [`HISTORY_CAP`] and its speed zeroed
    /// unless active.
    pub fn restore(&self, now: Timestamp, window: Duration) -> Option<Vec<Driver>> {
        match self.inner.load() {
            Ok(Some(record)) if record.payload.is_empty() => {
                debug!("fleet_cache_empty");
                None
            }
            Ok(Some(record)) if !record.is_fresh(now, window) => {
                info!(
                    age_ms = record.age_at(now).as_millis() as u64,
                    "fleet_cache_stale"
                );
                None
            }
            Ok(Some(record)) => {
                info!(drivers = record.payload.len(), "fleet_cache_restored");
                Some(record.payload.into_iter().map(normalise).collect())
            }
            Ok(None) => None,
            Err(error) => {
                warn!(error = %error, "fleet_cache_read_failed");
                None
            }
        }
    }

    /// Overwrite the stored record.  Returns whether the write succeeded.
    pub fn persist(&self, drivers: &[Driver], now: Timestamp) -> bool {
        match self.inner.save_payload(drivers, now) {
            Ok(()) => true,
            Err(error) => {
                warn!(error = %error, "fleet_cache_write_failed");
                false
            }
        }
    }

    /// The stored record regardless of age.
    pub fn load_raw(&self) -> CacheResult<Option<CacheRecord<Vec<Driver>>>> {
        self.inner.load()
    }
}

fn normalise(mut driver: Driver) -> Driver {
    driver.history.truncate(HISTORY_CAP);
    driver.set_speed_for_status(driver.speed_kmh);
    driver
}
