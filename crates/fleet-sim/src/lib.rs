//! `fleet-sim` — population generator and fleet state engine.
//!
//! # Tick
//!
//! ```text
//! every config.tick_interval (default 3 s):
//!   ① Sample    : draw floor(len × update_fraction) distinct indices.
//!   ② Walk      : each sampled, non-offline driver takes a ±walk_step_deg
//!                 step per axis, gets a fresh speed, and records a
//!                 history sample (capped at 10, newest first).
//!   ③ Persist   : with probability persist_probability, write the whole
//!                 population to the fleet cache.
//!   ④ Publish   : swap in a new immutable Snapshot.
//!   ⑤ Notify    : call every subscriber with that snapshot, isolating
//!                 errors and panics per subscriber.
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──connect()──▶ Running ──disconnect()──▶ Seeded ──connect()──▶ Running
//!        │                                                  ▲
//!        └──────────────subscribe() (seeds, no timer)───────┘
//! ```
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use fleet_cache::MemoryStore;
//! use fleet_sim::{FleetConfig, FleetEngineBuilder, Snapshot, SubscriberResult};
//!
//! let engine = FleetEngineBuilder::new(FleetConfig::default(), Arc::new(MemoryStore::new()))
//!     .build()?;
//! let sub = engine.subscribe(|s: &Snapshot| -> SubscriberResult {
//!     println!("tick {}: {} drivers", s.tick, s.len());
//!     Ok(())
//! });
//! engine.connect();
//! ```

pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod persistence;
pub mod snapshot;
pub mod subscriber;
mod timer;

#[cfg(test)]
mod tests;

pub use builder::FleetEngineBuilder;
pub use config::{FleetConfig, Region, default_regions};
pub use engine::{EngineState, FleetEngine, TickReport};
pub use error::{SimError, SimResult};
pub use generator::{SPEED_RANGE_KMH, generate, region_counts};
pub use persistence::{FLEET_CACHE_KEY, FleetCache};
pub use snapshot::{Snapshot, StatusCounts};
pub use subscriber::{FleetSubscriber, SubscriberError, SubscriberResult, Subscription, SubscriptionId};
