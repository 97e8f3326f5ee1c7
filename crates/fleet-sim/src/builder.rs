//! Fluent builder for constructing a [`FleetEngine`].

use std::sync::Arc;

use fleet_cache::KeyValueStore;
use fleet_core::{Clock, FleetRng, SystemClock};

use crate::persistence::FleetCache;
use crate::{FleetConfig, FleetEngine, SimResult};

/// Fluent builder for [`FleetEngine`].
///
/// # Required inputs
///
/// - [`FleetConfig`] - population size, regions, tick period, …
/// - `Arc<dyn KeyValueStore>` - where the fleet record is persisted
///
/// # Optional inputs (have defaults)
///
/// | Method       | Default                                          |
/// |--------------|--------------------------------------------------|
/// | `.clock(c)`  | [`SystemClock`]                                  |
/// | `.rng(r)`    | `FleetRng` seeded from `config.seed` or entropy  |
///
/// # Example
///
/// ```rust,ignore
/// let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir)?);
/// let engine = FleetEngineBuilder::new(FleetConfig::default(), store).build()?;
/// let _sub = engine.subscribe(|s: &Snapshot| -> SubscriberResult { render(s); Ok(()) });
/// engine.connect();
/// ```
pub struct FleetEngineBuilder {
    config: FleetConfig,
    store:  Arc<dyn KeyValueStore>,
    clock:  Option<Arc<dyn Clock>>,
    rng:    Option<FleetRng>,
}

impl FleetEngineBuilder {
    pub fn new(config: FleetConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self { config, store, clock: None, rng: None }
    }

    /// Supply the time source used for history samples and cache freshness.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Supply the RNG explicitly, overriding `config.seed`.
    pub fn rng(mut self, rng: FleetRng) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Validate the configuration and return an engine in the
    /// `Uninitialized` state.  Nothing is loaded or generated until the
    /// first `connect` or `subscribe`.
    pub fn build(self) -> SimResult<FleetEngine> {
        self.config.validate()?;
        let rng = self.rng.unwrap_or_else(|| FleetRng::from_seed_opt(self.config.seed));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cache = FleetCache::new(self.store);
        Ok(FleetEngine::from_parts(self.config, clock, cache, rng))
    }
}
