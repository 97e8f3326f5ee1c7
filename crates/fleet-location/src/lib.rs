//! `fleet-location` — where the user is, as best we can tell.
//!
//! # Fallback chain
//!
//! ```text
//! current_position():
//!   ① service disabled?            ──yes──▶ ④
//!   ② permission granted?          ──no───▶ request once ──still no──▶ ④
//!   ③ single live fix              ──ok───▶ persist, return it
//!                                  ──err──▶ ④
//!   ④ last cached fix (any age)    ──────▶ return it, or None
//! ```
//!
//! Nothing in the chain retries and nothing in it returns an error: a
//! `None` simply means no position is available.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                  |
//! |--------------|-----------------------------------------------------------|
//! | [`types`]    | `Position`, `Fix`, `PermissionStatus`, `WatchOptions`     |
//! | [`sensor`]   | `SensorProvider` / `SensorSubscription` traits            |
//! | [`throttle`] | time-or-distance gate for watch streams                   |
//! | [`cache`]    | `LocationCache`, the persisted last-known fix             |
//! | [`service`]  | `LocationService`, `WatchHandle`                          |
//! | [`error`]    | `LocationError`, `LocationResult<T>`                      |

pub mod cache;
pub mod error;
pub mod sensor;
pub mod service;
pub mod throttle;
pub mod types;


pub use cache::{LOCATION_CACHE_KEY, LocationCache, StoredLocation};
pub use error::{LocationError, LocationResult};
pub use sensor::{FixCallback, SensorError, SensorProvider, SensorSubscription};
pub use service::{LocationService, WatchHandle};
pub use throttle::Throttle;
pub use types::{Fix, PermissionStatus, Position, WatchOptions};
