//! The render-set filter.
//!
//! ```text
//! population ──▶ in bounds (inclusive) ──▶ stable sort by status priority ──▶ cap
//! ```
//!
//! The cap is a density heuristic, not a nearest-to-centre selection: when a
//! viewport holds more drivers than the cap, the ones kept are the highest
//! priority in population order.

use fleet_core::Driver;

use crate::Viewport;

/// Cap for a zoomed-out viewport (`lat_span > 1.0`).
pub const ZOOMED_OUT_CAP: usize = 100;

/// Cap for a zoomed-in viewport.
pub const ZOOMED_IN_CAP: usize = 250;

/// Drivers to draw for `viewport`, highest status priority first.
///
/// Returns an empty vector for an empty population or a missing viewport.
/// Drivers of equal priority keep their population order.
pub fn visible_drivers<'a>(population: &'a [Driver], viewport: Option<&Viewport>) -> Vec<&'a Driver> {
    let Some(viewport) = viewport else {
        return Vec::new();
    };

    let bounds = viewport.bounds();
    let mut visible: Vec<&Driver> = population
        .iter()
        .filter(|d| bounds.contains(d.point))
        .collect();

    // `sort_by_key` is stable.
    visible.sort_by_key(|d| std::cmp::Reverse(d.status.priority()));
    visible.truncate(viewport.density_cap());
    visible
}

/// [`visible_drivers`], cloned out of the population.
pub fn visible_owned(population: &[Driver], viewport: Option<&Viewport>) -> Vec<Driver> {
    visible_drivers(population, viewport).into_iter().cloned().collect()
}
