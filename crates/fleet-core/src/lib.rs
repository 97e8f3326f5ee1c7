//! `fleet-core` — foundational types for the live fleet tracker.
//!
//! This crate is a dependency of every other `fleet-*` crate.  It has no
//! `fleet-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `DriverId`                                            |
//! | [`geo`]         | `GeoPoint`, haversine distance                        |
//! | [`time`]        | `Timestamp`, `Clock`, `SystemClock`, `ManualClock`    |
//! | [`rng`]         | `FleetRng`                                            |
//! | [`driver`]      | `Driver`, `DriverStatus`, `HistorySample`             |
//! | [`error`]       | `FleetError`, `FleetResult`                           |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types; the    |
//! |         | fleet and location cache records require it.               |

pub mod driver;
pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use driver::{Driver, DriverStatus, HISTORY_CAP, HistorySample};
pub use error::{FleetError, FleetResult};
pub use geo::GeoPoint;
pub use ids::DriverId;
pub use rng::FleetRng;
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
