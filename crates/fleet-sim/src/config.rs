//! Engine configuration.
//!
//! Every field has a default, so a JSON config file only needs to name the
//! values it changes:
//!
//! ```json
//! { "driver_count": 2000, "tick_interval_ms": 1000, "seed": 42 }
//! ```

use std::path::Path;
use std::time::Duration;

use fleet_core::{FleetError, GeoPoint};
use serde::{Deserialize, Serialize};

use crate::SimResult;

/// A named anchor point drivers are generated around.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name:   String,
    pub anchor: GeoPoint,
}

impl Region {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self { name: name.into(), anchor: GeoPoint::new(lat, lon) }
    }
}

/// The eight metro areas the default fleet is spread across.
pub fn default_regions() -> Vec<Region> {
    vec![
        Region::new("Mumbai",    19.0760, 72.8777),
        Region::new("Delhi",     28.6139, 77.2090),
        Region::new("Bangalore", 12.9716, 77.5946),
        Region::new("Hyderabad", 17.3850, 78.4867),
        Region::new("Chennai",   13.0827, 80.2707),
        Region::new("Kolkata",   22.5726, 88.3639),
        Region::new("Pune",      18.5204, 73.8567),
        Region::new("Ahmedabad", 23.0225, 72.5714),
    ]
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Population size produced by the generator.
    pub driver_count: usize,

    pub regions: Vec<Region>,

    /// Generation offset from the region anchor, ± degrees per axis.
    pub jitter_deg: f64,

    /// Timer period.
    pub tick_interval_ms: u64,

    /// Share of the population sampled each tick (floored to a count).
    pub update_fraction: f64,

    /// Random-walk step, ± degrees per axis.
    pub walk_step_deg: f64,

    /// Probability that a tick persists the population.
    pub persist_probability: f64,

    /// Maximum age of a fleet cache record that may be restored.
    pub freshness_window_ms: u64,

    /// RNG seed.  `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            driver_count:        500,
            regions:             default_regions(),
            jitter_deg:          0.075,
            tick_interval_ms:    3_000,
            update_fraction:     0.3,
            walk_step_deg:       0.0005,
            persist_probability: 0.2,
            freshness_window_ms: 60 * 60 * 1_000,
            seed:                None,
        }
    }
}

impl FleetConfig {
    /// Load a config from a JSON file.  Missing fields take their defaults.
    pub fn from_json_path(path: &Path) -> SimResult<Self> {
        let text = std::fs::read_to_string(path).map_err(FleetError::from)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> SimResult<Self> {
        let config: FleetConfig = serde_json::from_str(text)
            .map_err(|e| FleetError::Parse(format!("fleet config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    #[inline]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    #[inline]
    pub fn freshness_window(&self) -> Duration {
        Duration::from_millis(self.freshness_window_ms)
    }

    /// Number of indices sampled per tick for a population of `len`.
    #[inline]
    pub fn update_count(&self, len: usize) -> usize {
        (len as f64 * self.update_fraction).floor() as usize
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> SimResult<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.update_fraction) {
            return Err(config_err(format!("update_fraction {} outside [0, 1]", self.update_fraction)));
        }
        if !unit.contains(&self.persist_probability) {
            return Err(config_err(format!(
                "persist_probability {} outside [0, 1]",
                self.persist_probability
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(config_err("tick_interval_ms must be positive".into()));
        }
        if !(self.jitter_deg >= 0.0) || !(self.walk_step_deg >= 0.0) {
            return Err(config_err("jitter_deg and walk_step_deg must be non-negative".into()));
        }
        if self.driver_count > 0 && self.regions.is_empty() {
            return Err(config_err("driver_count > 0 requires at least one region".into()));
        }
        if u32::try_from(self.driver_count).is_err() {
            return Err(config_err(format!("driver_count {} exceeds the id space", self.driver_count)));
        }
        Ok(())
    }
}

fn config_err(msg: String) -> crate::SimError {
    FleetError::Config(msg).into()
}
