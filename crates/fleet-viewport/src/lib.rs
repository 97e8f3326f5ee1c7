//! `fleet-viewport` — what a map should draw.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                 |
//! |--------------|----------------------------------------------------------|
//! | [`viewport`] | `Viewport`, `Bounds`, `initial_viewport`                 |
//! | [`filter`]   | `visible_drivers`, `visible_owned`, density caps         |
//!
//! Everything here is a pure function of its inputs.  Call it as often as
//! the map moves; it never touches the population it is given.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on `Viewport` and `Bounds`. |

pub mod filter;
pub mod viewport;


pub use filter::{ZOOMED_IN_CAP, ZOOMED_OUT_CAP, visible_drivers, visible_owned};
pub use viewport::{Bounds, DEFAULT_CENTER, INITIAL_SPAN_DEG, Viewport, initial_viewport};
