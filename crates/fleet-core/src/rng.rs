//! Fleet-level RNG wrapper.
//!
//! One `FleetRng` is owned by the engine and drives both generation and the
//! per-tick random walk.  It is only touched from inside the engine's
//! seeding and tick critical sections, so it needs no synchronisation of
//! its own.
//!
//! Seeded construction makes population shape *and* content reproducible,
//! which the tests rely on.  Production wiring uses [`FleetRng::from_entropy`].

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

pub struct FleetRng(SmallRng);

impl FleetRng {
    pub fn new(seed: u64) -> Self {
        FleetRng(SmallRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        FleetRng(SmallRng::from_entropy())
    }

    /// Seeded if `seed` is `Some`, entropy otherwise.
    pub fn from_seed_opt(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::new(s),
            None    => Self::from_entropy(),
        }
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Uniform offset in `[-half, half]`.  Returns 0 when `half` is 0.
    #[inline]
    pub fn jitter(&mut self, half: f64) -> f64 {
        if half > 0.0 {
            self.0.gen_range(-half..=half)
        } else {
            0.0
        }
    }

    /// Draw `amount` distinct indices from `0..len` (clamped to `len`).
    ///
    /// Uses index-set sampling, so cost is bounded by `amount` rather than
    /// growing with rejected duplicates.
    pub fn sample_indices(&mut self, len: usize, amount: usize) -> Vec<usize> {
        let amount = amount.min(len);
        rand::seq::index::sample(&mut self.0, len, amount).into_vec()
    }
}
