//! Initial population synthesis.
//!
//! The *shape* of a generated population is fully determined by its inputs:
//! `count` drivers, ids `0..count` in order, `count / regions.len()` per
//! region in region order, and the remainder appended to the first region.
//! Content (positions, statuses, speeds) comes from the RNG.

use std::ops::Range;

use fleet_core::{Driver, DriverId, DriverStatus, FleetRng};

use crate::Region;

/// Speeds are whole km/h drawn from this range while active.
pub const SPEED_RANGE_KMH: Range<u32> = 10..70;

/// Number of drivers each region receives, in region order.
///
/// The remainder of the integer division goes to the first region.
pub fn region_counts(count: usize, regions: usize) -> Vec<usize> {
    if regions == 0 {
        return Vec::new();
    }
    let per_region = count / regions;
    let mut counts = vec![per_region; regions];
    counts[0] += count - per_region * regions;
    counts
}

/// Produce exactly `count` drivers spread over `regions`.
///
/// Returns an empty population when `regions` is empty.
pub fn generate(count: usize, regions: &[Region], jitter_deg: f64, rng: &mut FleetRng) -> Vec<Driver> {
    if regions.is_empty() {
        return Vec::new();
    }

    let per_region = count / regions.len();
    let remainder = count - per_region * regions.len();

    // Even blocks first, then the remainder tagged with the first region, so
    // ids stay sequential in generation order.
    let placements = regions
        .iter()
        .flat_map(|region| std::iter::repeat_n(region, per_region))
        .chain(std::iter::repeat_n(&regions[0], remainder));

    placements
        .enumerate()
        .map(|(i, region)| {
            let id = DriverId(i as u32);
            let point = region
                .anchor
                .offset(rng.jitter(jitter_deg), rng.jitter(jitter_deg));
            let status = DriverStatus::GENERATED[rng.gen_range(0..DriverStatus::GENERATED.len())];
            let speed = if status == DriverStatus::Active { rng.gen_range(SPEED_RANGE_KMH) } else { 0 };
            Driver::new(id, point, status, speed, Some(region.name.clone()))
        })
        .collect()
}
