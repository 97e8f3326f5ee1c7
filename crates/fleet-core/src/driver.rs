//! The simulated driver entity.
//!
//! A [`Driver`] is created once by the generator (or restored from cache)
//! and afterwards only mutated by the engine tick through
//! [`Driver::record_move`] and [`Driver::set_speed_for_status`].  Both keep
//! the entity invariants:
//!
//! - `history.len() <= HISTORY_CAP`, newest sample first.
//! - An `Offline` driver has `speed_kmh == 0`.

use std::str::FromStr;

use crate::{DriverId, FleetError, GeoPoint, Timestamp};

/// Maximum number of movement samples retained per driver.
pub const HISTORY_CAP: usize = 10;

// ── DriverStatus ──────────────────────────────────────────────────────────────

/// Motion status of a driver.
///
/// `Unknown` is never produced by the generator; it is what an unrecognised
/// status string decodes to, and it sorts below every known status.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DriverStatus {
    Active,
    Idle,
    Offline,
    #[cfg_attr(feature = "serde", serde(other))]
    Unknown,
}

impl DriverStatus {
    /// The three statuses the generator draws from, in draw order.
    pub const GENERATED: [DriverStatus; 3] =
        [DriverStatus::Active, DriverStatus::Idle, DriverStatus::Offline];

    /// Render priority: higher sorts first in the viewport.
    #[inline]
    pub fn priority(self) -> u8 {
        match self {
            DriverStatus::Active  => 3,
            DriverStatus::Idle    => 2,
            DriverStatus::Offline => 1,
            DriverStatus::Unknown => 0,
        }
    }

    /// Offline drivers never move.
    #[inline]
    pub fn is_movable(self) -> bool {
        !matches!(self, DriverStatus::Offline)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DriverStatus::Active  => "active",
            DriverStatus::Idle    => "idle",
            DriverStatus::Offline => "offline",
            DriverStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriverStatus {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active"  => Ok(DriverStatus::Active),
            "idle"    => Ok(DriverStatus::Idle),
            "offline" => Ok(DriverStatus::Offline),
            "unknown" => Ok(DriverStatus::Unknown),
            other     => Err(FleetError::Parse(format!("unknown driver status {other:?}"))),
        }
    }
}

// ── HistorySample ─────────────────────────────────────────────────────────────

/// One past position of a driver.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistorySample {
    pub point:     GeoPoint,
    pub timestamp: Timestamp,
}

// ── Driver ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Driver {
    pub id:        DriverId,
    /// Display label derived from `id`; see [`Driver::display_name`].
    pub name:      String,
    pub point:     GeoPoint,
    pub status:    DriverStatus,
    /// Only meaningful while `status == Active`; zero otherwise.
    pub speed_kmh: u32,
    /// Newest first, at most [`HISTORY_CAP`] entries.
    #[cfg_attr(feature = "serde", serde(default))]
    pub history:   Vec<HistorySample>,
    /// Name of the region the driver was generated in.
    #[cfg_attr(feature = "serde", serde(default))]
    pub region:    Option<String>,
}

impl Driver {
    /// Build a driver with an empty history.  Speed is forced to zero for
    /// any status other than `Active`.
    pub fn new(
        id:        DriverId,
        point:     GeoPoint,
        status:    DriverStatus,
        speed_kmh: u32,
        region:    Option<String>,
    ) -> Self {
        let mut driver = Driver {
            id,
            name: Self::display_name(id),
            point,
            status,
            speed_kmh: 0,
            history: Vec::new(),
            region,
        };
        driver.set_speed_for_status(speed_kmh);
        driver
    }

    /// `"Driver 007"` for id 7.
    pub fn display_name(id: DriverId) -> String {
        format!("Driver {:03}", id.0)
    }

    /// Assign `speed_kmh` if the driver is active, zero otherwise.
    #[inline]
    pub fn set_speed_for_status(&mut self, speed_kmh: u32) {
        self.speed_kmh = if self.status == DriverStatus::Active { speed_kmh } else { 0 };
    }

    /// Move to `point` and prepend a history sample, evicting the oldest
    /// samples beyond [`HISTORY_CAP`].
    ///
    /// The sample timestamp is clamped to be no earlier than the current
    /// newest sample so the history stays ordered newest-first even if the
    /// wall clock steps backwards.
    pub fn record_move(&mut self, point: GeoPoint, at: Timestamp) {
        let at = match self.history.first() {
            Some(newest) if newest.timestamp > at => newest.timestamp,
            _ => at,
        };
        self.point = point;
        self.history.insert(0, HistorySample { point, timestamp: at });
        self.history.truncate(HISTORY_CAP);
    }

    /// Movement trail as a polyline, newest point first.
    pub fn route(&self) -> Vec<GeoPoint> {
        self.history.iter().map(|s| s.point).collect()
    }
}
