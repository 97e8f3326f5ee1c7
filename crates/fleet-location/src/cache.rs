//! The persisted last-known fix.
//!
//! Unlike the fleet record this one never expires: any stored fix beats
//! having no position at all.

use std::sync::Arc;

use fleet_cache::{CacheRecord, CacheResult, KeyValueStore, TypedCache};
use fleet_core::GeoPoint;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Fix, Position};

/// Store key of the last-known-location record.
pub const LOCATION_CACHE_KEY: &str = "user_location_cache";

/// On-disk payload.  The record's `captured_at` is the fix timestamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredLocation {
    pub latitude:  f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy:  Option<f64>,
}

impl StoredLocation {
    pub fn position(&self) -> Position {
        Position::new(GeoPoint::new(self.latitude, self.longitude), self.accuracy)
    }
}

impl From<&Position> for StoredLocation {
    fn from(p: &Position) -> Self {
        Self { latitude: p.point.lat, longitude: p.point.lon, accuracy: p.accuracy_m }
    }
}

#[derive(Clone)]
pub struct LocationCache {
    inner: TypedCache<StoredLocation>,
}

impl LocationCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { inner: TypedCache::new(store, LOCATION_CACHE_KEY) }
    }

    /// Overwrite the stored fix.  Failures are logged, never raised.
    pub fn store(&self, fix: &Fix) -> bool {
        let record = CacheRecord::new(StoredLocation::from(&fix.position), fix.timestamp);
        match self.inner.save(&record) {
            Ok(()) => true,
            Err(error) => {
                warn!(error = %error, "location_cache_write_failed");
                false
            }
        }
    }

    /// The stored fix, any age.
    pub fn load(&self) -> CacheResult<Option<Fix>> {
        Ok(self
            .inner
            .load()?
            .map(|r| Fix::new(r.payload.position(), r.captured_at)))
    }

    /// [`load`](Self::load) with failures logged and folded into `None`.
    pub fn load_or_none(&self) -> Option<Fix> {
        self.load().unwrap_or_else(|error| {
            warn!(error = %error, "location_cache_read_failed");
            None
        })
    }
}
