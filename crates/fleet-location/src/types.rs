//! Plain data exchanged with the sensor and the caller.

use std::time::Duration;

use fleet_core::{GeoPoint, Timestamp};

/// A position as handed to callers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Position {
    pub point:      GeoPoint,
    /// Horizontal accuracy radius in metres, when the sensor reports one.
    pub accuracy_m: Option<f64>,
}

impl Position {
    pub fn new(point: GeoPoint, accuracy_m: Option<f64>) -> Self {
        Self { point, accuracy_m }
    }

    /// Finite coordinates inside the WGS-84 ranges.
    pub fn is_valid(&self) -> bool {
        let GeoPoint { lat, lon } = self.point;
        lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
    }
}

/// A position together with the moment the sensor took it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Fix {
    pub position:  Position,
    pub timestamp: Timestamp,
}

impl Fix {
    pub fn new(position: Position, timestamp: Timestamp) -> Self {
        Self { position, timestamp }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The user has not been asked yet.
    Undetermined,
}

impl PermissionStatus {
    #[inline]
    pub fn is_granted(self) -> bool {
        self == PermissionStatus::Granted
    }
}

/// Minimum spacing between delivered fixes: a fix passes once *either*
/// threshold is met.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WatchOptions {
    pub min_interval:   Duration,
    pub min_distance_m: f64,
}

impl WatchOptions {
    /// Foreground watch: 10 s or 10 m.
    pub const FOREGROUND: WatchOptions = WatchOptions {
        min_interval:   Duration::from_secs(10),
        min_distance_m: 10.0,
    };

    /// Background tracking: 60 s or 50 m.
    pub const BACKGROUND: WatchOptions = WatchOptions {
        min_interval:   Duration::from_secs(60),
        min_distance_m: 50.0,
    };
}
