//! Integration tests for fleet-sim.

use std::sync::Arc;
use std::time::Duration;

use fleet_cache::{CacheError, CacheResult, KeyValueStore, MemoryStore};
use fleet_core::{Driver, DriverId, DriverStatus, FleetRng, GeoPoint, ManualClock, Timestamp};

use crate::{FleetCache, FleetConfig, FleetEngine, FleetEngineBuilder, Region};

// ── Helpers ───────────────────────────────────────────────────────────────────

const T0: Timestamp = Timestamp(1_700_000_000_000);

fn test_config(driver_count: usize) -> FleetConfig {
    FleetConfig {
        driver_count,
        seed: Some(42),
        persist_probability: 0.0,
        ..FleetConfig::default()
    }
}

fn engine_with(config: FleetConfig, store: Arc<dyn KeyValueStore>, clock: &ManualClock) -> FleetEngine {
    FleetEngineBuilder::new(config, store)
        .clock(Arc::new(clock.clone()))
        .build()
        .unwrap()
}

/// Ten drivers at distinct points; ids 0..3 offline, 3..6 idle, 6..10 active.
fn ten_with_three_offline() -> Vec<Driver> {
    (0..10u32)
        .map(|i| {
            let status = match i {
                0..=2 => DriverStatus::Offline,
                3..=5 => DriverStatus::Idle,
                _     => DriverStatus::Active,
            };
            let point = GeoPoint::new(12.9 + i as f64 * 0.01, 77.5);
            Driver::new(DriverId(i), point, status, 40, Some("Bangalore".into()))
        })
        .collect()
}

/// A store seeded with `drivers`, captured at `at`.
fn seeded_store(drivers: &[Driver], at: Timestamp) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    assert!(FleetCache::new(store.clone()).persist(drivers, at));
    store
}

/// Store whose every call fails.
struct BrokenStore;

impl KeyValueStore for BrokenStore {
    fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::Io(std::io::Error::other("disk gone")))
    }
    fn set(&self, _key: &str, _value: &str) -> CacheResult<()> {
        Err(CacheError::Io(std::io::Error::other("disk gone")))
    }
    fn remove(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::Io(std::io::Error::other("disk gone")))
    }
}

// ── Generator ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod generator_tests {
    use std::collections::{HashMap, HashSet};

    use super::*;
    use crate::{SPEED_RANGE_KMH, default_regions, generate, region_counts};

    #[test]
    fn exact_count_and_sequential_ids() {
        let mut rng = FleetRng::new(1);
        let drivers = generate(500, &default_regions(), 0.075, &mut rng);
        assert_eq!(drivers.len(), 500);
        let ids: HashSet<u32> = drivers.iter().map(|d| d.id.0).collect();
        assert_eq!(ids.len(), 500);
        assert!(drivers.iter().enumerate().all(|(i, d)| d.id == DriverId(i as u32)));
    }

    #[test]
    fn five_hundred_over_eight_regions() {
        let mut rng = FleetRng::new(2);
        let drivers = generate(500, &default_regions(), 0.075, &mut rng);
        let mut per_region: HashMap<&str, usize> = HashMap::new();
        for d in &drivers {
            *per_region.entry(d.region.as_deref().unwrap()).or_default() += 1;
        }
        assert_eq!(per_region.len(), 8);
        assert_eq!(per_region["Mumbai"], 62 + 4);
        for (name, count) in per_region {
            if name != "Mumbai" {
                assert_eq!(count, 62, "{name}");
            }
        }
    }

    #[test]
    fn region_counts_put_remainder_first() {
        assert_eq!(region_counts(500, 8), vec![66, 62, 62, 62, 62, 62, 62, 62]);
        assert_eq!(region_counts(3, 5), vec![3, 0, 0, 0, 0]);
        assert_eq!(region_counts(10, 0), Vec::<usize>::new());
        assert_eq!(region_counts(10, 2).iter().sum::<usize>(), 10);
    }

    #[test]
    fn positions_stay_inside_jitter_window() {
        let regions = default_regions();
        let mut rng = FleetRng::new(3);
        let drivers = generate(800, &regions, 0.075, &mut rng);
        for d in &drivers {
            let region = regions.iter().find(|r| Some(&r.name) == d.region.as_ref()).unwrap();
            assert!(d.point.within_bbox(region.anchor, 0.075 + 1e-12), "{} at {}", d.id, d.point);
        }
    }

    #[test]
    fn speeds_match_status_and_history_starts_empty() {
        let mut rng = FleetRng::new(4);
        for d in generate(600, &default_regions(), 0.075, &mut rng) {
            if d.status == DriverStatus::Active {
                assert!(SPEED_RANGE_KMH.contains(&d.speed_kmh));
            } else {
                assert_eq!(d.speed_kmh, 0);
            }
            assert!(d.history.is_empty());
            assert_ne!(d.status, DriverStatus::Unknown);
        }
    }

    #[test]
    fn all_statuses_are_drawn() {
        let mut rng = FleetRng::new(5);
        let drivers = generate(300, &default_regions(), 0.075, &mut rng);
        for status in DriverStatus::GENERATED {
            assert!(drivers.iter().any(|d| d.status == status), "{status} never drawn");
        }
    }

    #[test]
    fn no_regions_means_no_drivers() {
        let mut rng = FleetRng::new(6);
        assert!(generate(10, &[], 0.075, &mut rng).is_empty());
        assert!(generate(0, &[Region::new("X", 0.0, 0.0)], 0.075, &mut rng).is_empty());
    }
}

// ── Configuration ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod config_tests {
    use super::*;
    use crate::SimError;

    #[test]
    fn defaults() {
        let c = FleetConfig::default();
        assert_eq!(c.driver_count, 500);
        assert_eq!(c.regions.len(), 8);
        assert_eq!(c.tick_interval(), Duration::from_secs(3));
        assert_eq!(c.freshness_window(), Duration::from_secs(3_600));
        assert_eq!(c.update_count(10), 3);
        assert_eq!(c.update_count(500), 150);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c = FleetConfig::from_json_str(r#"{ "driver_count": 40, "seed": 9 }"#).unwrap();
        assert_eq!(c.driver_count, 40);
        assert_eq!(c.seed, Some(9));
        assert_eq!(c.walk_step_deg, 0.0005);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad = [
            FleetConfig { update_fraction: 1.5, ..FleetConfig::default() },
            FleetConfig { persist_probability: -0.1, ..FleetConfig::default() },
            FleetConfig { tick_interval_ms: 0, ..FleetConfig::default() },
            FleetConfig { walk_step_deg: -1.0, ..FleetConfig::default() },
            FleetConfig { regions: vec![], ..FleetConfig::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(SimError::Core(_))), "{config:?}");
        }
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let result = FleetEngineBuilder::new(FleetConfig { tick_interval_ms: 0, ..FleetConfig::default() }, store)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(FleetConfig::from_json_str("{ driver_count: }").is_err());
    }

    #[test]
    fn config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.json");
        std::fs::write(&path, r#"{ "tick_interval_ms": 250 }"#).unwrap();
        let c = FleetConfig::from_json_path(&path).unwrap();
        assert_eq!(c.tick_interval(), Duration::from_millis(250));
        assert!(FleetConfig::from_json_path(&dir.path().join("missing.json")).is_err());
    }
}

// ── Seeding and lifecycle ─────────────────────────────────────────────────────

#[cfg(test)]
mod lifecycle_tests {
    use fleet_core::{HISTORY_CAP, HistorySample};

    use super::*;
    use crate::EngineState;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn connect_generates_persists_and_runs() {
        let clock = ManualClock::new(T0);
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(test_config(50), store.clone(), &clock);
        assert_eq!(engine.state(), EngineState::Uninitialized);

        engine.connect();
        assert_eq!(engine.state(), EngineState::Running);
        assert_eq!(engine.snapshot().len(), 50);
        assert_eq!(engine.generation_count(), 1);

        let cached = engine.cached_snapshot().unwrap().unwrap();
        assert_eq!(cached.payload.len(), 50);
        assert_eq!(cached.captured_at, T0);

        engine.connect();
        assert_eq!(engine.generation_count(), 1);

        engine.disconnect();
        assert_eq!(engine.state(), EngineState::Seeded);
        assert_eq!(engine.snapshot().len(), 50);
        engine.connect();
        assert_eq!(engine.generation_count(), 1);
        engine.disconnect();
    }

    #[test]
    fn fresh_cache_is_restored_at_59_minutes() {
        let drivers = ten_with_three_offline();
        let store = seeded_store(&drivers, T0);
        let clock = ManualClock::new(T0);
        clock.advance(59 * MINUTE);

        let engine = engine_with(test_config(500), store, &clock);
        engine.connect();
        engine.disconnect();

        assert_eq!(engine.generation_count(), 0);
        assert_eq!(&engine.snapshot().drivers[..], &drivers[..]);
    }

    #[test]
    fn restored_drivers_are_normalised() {
        let mut drivers = ten_with_three_offline();
        drivers[0].speed_kmh = 55;
        let point = drivers[9].point;
        drivers[9].history = (0..15i64)
            .map(|i| HistorySample { point, timestamp: Timestamp(T0.0 - i * 1_000) })
            .collect();
        let newest = drivers[9].history[0];
        let store = seeded_store(&drivers, T0);

        let clock = ManualClock::new(T0);
        let engine = engine_with(test_config(500), store, &clock);
        engine.connect();
        engine.disconnect();

        let snapshot = engine.snapshot();
        assert_eq!(engine.generation_count(), 0);
        assert_eq!(snapshot.find(DriverId(0)).unwrap().speed_kmh, 0);
        assert_eq!(snapshot.find(DriverId(6)).unwrap().speed_kmh, 40);
        let trail = &snapshot.find(DriverId(9)).unwrap().history;
        assert_eq!(trail.len(), HISTORY_CAP);
        assert_eq!(trail[0], newest);
    }

    #[test]
    fn stale_cache_is_ignored_at_61_minutes() {
        let store = seeded_store(&ten_with_three_offline(), T0);
        let clock = ManualClock::new(T0);
        clock.advance(61 * MINUTE);

        let engine = engine_with(test_config(500), store, &clock);
        engine.connect();
        engine.disconnect();

        assert_eq!(engine.generation_count(), 1);
        assert_eq!(engine.snapshot().len(), 500);
    }

    #[test]
    fn corrupt_cache_falls_back_to_generation() {
        let store = Arc::new(MemoryStore::new());
        store.set(crate::FLEET_CACHE_KEY, "{ not json").unwrap();
        let clock = ManualClock::new(T0);
        let engine = engine_with(test_config(20), store, &clock);
        engine.connect();
        engine.disconnect();
        assert_eq!(engine.generation_count(), 1);
        assert_eq!(engine.snapshot().len(), 20);
    }

    #[test]
    fn broken_store_never_stops_the_engine() {
        let clock = ManualClock::new(T0);
        let config = FleetConfig { persist_probability: 1.0, ..test_config(30) };
        let engine = engine_with(config, Arc::new(BrokenStore), &clock);
        engine.connect();
        engine.disconnect();
        assert_eq!(engine.snapshot().len(), 30);

        let report = engine.tick();
        assert_eq!(report.tick, 1);
        assert!(!report.persisted);
        assert!(engine.cached_snapshot().is_err());
    }

    #[test]
    fn get_by_id_hits_and_misses() {
        let clock = ManualClock::new(T0);
        let engine = engine_with(test_config(25), Arc::new(MemoryStore::new()), &clock);
        assert!(engine.get_by_id(DriverId(0)).is_none());

        engine.connect();
        engine.disconnect();
        let d = engine.get_by_id(DriverId(24)).unwrap();
        assert_eq!(d.id, DriverId(24));
        assert_eq!(d.name, "Driver 024");
        assert!(engine.get_by_id(DriverId(25)).is_none());
        assert!(engine.get_by_id(DriverId::INVALID).is_none());
    }

    #[test]
    fn get_by_id_sees_latest_tick() {
        let clock = ManualClock::new(T0);
        let config = FleetConfig { update_fraction: 1.0, ..test_config(0) };
        let store = seeded_store(&ten_with_three_offline(), T0);
        let engine = engine_with(config, store, &clock);
        engine.connect();
        engine.disconnect();

        clock.advance(Duration::from_secs(3));
        engine.tick();
        let d = engine.get_by_id(DriverId(9)).unwrap();
        assert_eq!(d.history.len(), 1);
        assert_eq!(d.point, engine.snapshot().find(DriverId(9)).unwrap().point);
    }
}

// ── Tick semantics ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tick_tests {
    use super::*;
    use fleet_core::HISTORY_CAP;

    use crate::SPEED_RANGE_KMH;

    fn seeded_engine(config: FleetConfig, clock: &ManualClock) -> FleetEngine {
        let store = seeded_store(&ten_with_three_offline(), T0);
        let engine = engine_with(config, store, clock);
        engine.connect();
        engine.disconnect();
        engine
    }

    #[test]
    fn ten_drivers_three_offline() {
        let clock = ManualClock::new(T0);
        let engine = seeded_engine(test_config(0), &clock);
        let before = engine.snapshot();

        for _ in 0..50 {
            clock.advance(Duration::from_secs(3));
            let report = engine.tick();
            assert_eq!(report.selected, 3);
            assert!(report.moved <= 3);
        }

        let after = engine.snapshot();
        for (old, new) in before.drivers.iter().zip(after.drivers.iter()) {
            if old.status == DriverStatus::Offline {
                assert_eq!(old, new, "offline driver {} changed", old.id);
            }
        }
    }

    #[test]
    fn at_most_three_mutated_per_tick_and_never_offline() {
        let clock = ManualClock::new(T0);
        let engine = seeded_engine(test_config(0), &clock);

        for _ in 0..30 {
            let before = engine.snapshot();
            clock.advance(Duration::from_secs(3));
            engine.tick();
            let after = engine.snapshot();
            let changed: Vec<_> = before
                .drivers
                .iter()
                .zip(after.drivers.iter())
                .filter(|(a, b)| a != b)
                .map(|(a, _)| a)
                .collect();
            assert!(changed.len() <= 3);
            assert!(changed.iter().all(|d| d.status != DriverStatus::Offline));
        }
    }

    #[test]
    fn invariants_hold_over_many_ticks() {
        let clock = ManualClock::new(T0);
        let config = FleetConfig { update_fraction: 0.5, ..test_config(200) };
        let engine = engine_with(config, Arc::new(MemoryStore::new()), &clock);
        engine.connect();
        engine.disconnect();
        let initial = engine.snapshot();

        for _ in 0..40 {
            clock.advance(Duration::from_secs(3));
            engine.tick();
            let snap = engine.snapshot();
            for (d, orig) in snap.drivers.iter().zip(initial.drivers.iter()) {
                assert!(d.history.len() <= HISTORY_CAP);
                assert!(d.history.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
                assert_eq!(d.id, orig.id);
                if d.status == DriverStatus::Offline {
                    assert_eq!(d.speed_kmh, 0);
                    assert_eq!(d.point, orig.point);
                    assert!(d.history.is_empty());
                } else if d.status == DriverStatus::Active && !d.history.is_empty() {
                    assert!(SPEED_RANGE_KMH.contains(&d.speed_kmh));
                } else if d.status == DriverStatus::Idle {
                    assert_eq!(d.speed_kmh, 0);
                }
            }
        }
        assert!(engine.snapshot().drivers.iter().any(|d| d.history.len() == HISTORY_CAP));
    }

    #[test]
    fn walk_step_is_small() {
        let clock = ManualClock::new(T0);
        let config = FleetConfig { update_fraction: 1.0, ..test_config(0) };
        let engine = seeded_engine(config, &clock);
        let before = engine.snapshot();
        clock.advance(Duration::from_secs(3));
        engine.tick();
        let after = engine.snapshot();
        for (a, b) in before.drivers.iter().zip(after.drivers.iter()) {
            assert!(b.point.within_bbox(a.point, 0.0005 + 1e-12));
            if a.status != DriverStatus::Offline {
                assert_eq!(b.history[0].point, b.point);
                assert_eq!(b.history[0].timestamp, Timestamp(T0.0 + 3_000));
            }
        }
    }

    #[test]
    fn ticks_publish_new_snapshots_and_keep_old_ones_intact() {
        let clock = ManualClock::new(T0);
        let config = FleetConfig { update_fraction: 1.0, ..test_config(0) };
        let engine = seeded_engine(config, &clock);
        let held = engine.snapshot();
        let held_copy: Vec<Driver> = held.drivers.to_vec();

        engine.tick();
        assert_eq!(&held.drivers[..], &held_copy[..]);
        assert_eq!(engine.snapshot().tick, held.tick + 1);
    }

    #[test]
    fn persistence_follows_probability() {
        let clock = ManualClock::new(T0);
        let config = FleetConfig { persist_probability: 1.0, update_fraction: 1.0, ..test_config(0) };
        let store = seeded_store(&ten_with_three_offline(), T0);
        let engine = engine_with(config, store, &clock);
        engine.connect();
        engine.disconnect();

        clock.advance(Duration::from_secs(3));
        assert!(engine.tick().persisted);
        let cached = engine.cached_snapshot().unwrap().unwrap();
        assert_eq!(cached.captured_at, Timestamp(T0.0 + 3_000));
        assert_eq!(&cached.payload[..], &engine.snapshot().drivers[..]);

        let clock2 = ManualClock::new(T0);
        let quiet = seeded_engine(test_config(0), &clock2);
        for _ in 0..20 {
            assert!(!quiet.tick().persisted);
        }
    }

    #[test]
    fn persistence_rate_is_roughly_one_in_five() {
        let clock = ManualClock::new(T0);
        let config = FleetConfig { persist_probability: 0.2, ..test_config(0) };
        let engine = seeded_engine(config, &clock);
        let persisted = (0..1_000).filter(|_| engine.tick().persisted).count();
        assert!((120..=280).contains(&persisted), "persisted {persisted}/1000");
    }

    #[test]
    fn tick_on_empty_engine_is_a_no_op() {
        let clock = ManualClock::new(T0);
        let engine = engine_with(test_config(10), Arc::new(MemoryStore::new()), &clock);
        let report = engine.tick();
        assert_eq!(report.moved, 0);
        assert!(engine.snapshot().is_empty());
    }

    #[test]
    fn seeded_engines_are_reproducible() {
        let run = || {
            let clock = ManualClock::new(T0);
            let engine = FleetEngineBuilder::new(test_config(40), Arc::new(MemoryStore::new()))
                .clock(Arc::new(clock.clone()))
                .rng(FleetRng::new(99))
                .build()
                .unwrap();
            engine.connect();
            engine.disconnect();
            for _ in 0..5 {
                engine.tick();
            }
            engine.snapshot().drivers.to_vec()
        };
        assert_eq!(run(), run());
    }
}

// ── Subscribers ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod subscriber_tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Barrier, Mutex};

    use crossbeam_channel::unbounded;

    use super::*;
    use crate::{Snapshot, SubscriberError, SubscriberResult};

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&Snapshot) -> SubscriberResult + Send + Sync + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        (hits, move |_: &Snapshot| -> SubscriberResult {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn subscribe_delivers_immediately_and_seeds() {
        let clock = ManualClock::new(T0);
        let engine = engine_with(test_config(12), Arc::new(MemoryStore::new()), &clock);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let _sub = engine.subscribe(move |snap: &Snapshot| -> SubscriberResult {
            s.lock().unwrap().push(snap.len());
            Ok(())
        });
        assert_eq!(*seen.lock().unwrap(), vec![12]);
        assert_eq!(engine.generation_count(), 1);
        assert!(!engine.is_running());
    }

    #[test]
    fn concurrent_subscribes_generate_once() {
        for _ in 0..20 {
            let clock = ManualClock::new(T0);
            let engine = engine_with(test_config(100), Arc::new(MemoryStore::new()), &clock);
            let barrier = Arc::new(Barrier::new(2));

            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let engine = engine.clone();
                    let barrier = barrier.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        let (hits, f) = counter();
                        engine.subscribe(f).detach();
                        hits.load(Ordering::SeqCst)
                    })
                })
                .collect();

            for h in handles {
                assert_eq!(h.join().unwrap(), 1);
            }
            assert_eq!(engine.generation_count(), 1);
            assert_eq!(engine.subscriber_count(), 2);
        }
    }

    #[test]
    fn subscribe_racing_connect_generates_once() {
        let clock = ManualClock::new(T0);
        let engine = engine_with(test_config(100), Arc::new(MemoryStore::new()), &clock);
        let barrier = Arc::new(Barrier::new(2));
        let (e1, b1) = (engine.clone(), barrier.clone());
        let t = std::thread::spawn(move || {
            b1.wait();
            e1.connect();
        });
        barrier.wait();
        let (_hits, f) = counter();
        let _sub = engine.subscribe(f);
        t.join().unwrap();
        engine.disconnect();
        assert_eq!(engine.generation_count(), 1);
    }

    #[test]
    fn every_tick_reaches_every_subscriber() {
        let clock = ManualClock::new(T0);
        let engine = engine_with(test_config(10), Arc::new(MemoryStore::new()), &clock);
        let (a, fa) = counter();
        let (b, fb) = counter();
        let _sa = engine.subscribe(fa);
        let _sb = engine.subscribe(fb);
        for _ in 0..4 {
            engine.tick();
        }
        assert_eq!(a.load(Ordering::SeqCst), 5);
        assert_eq!(b.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn failing_and_panicking_subscribers_are_isolated() {
        let clock = ManualClock::new(T0);
        let engine = engine_with(test_config(10), Arc::new(MemoryStore::new()), &clock);
        let _bad = engine.subscribe(|_: &Snapshot| -> SubscriberResult { Err(SubscriberError::msg("nope")) });
        let _boom = engine.subscribe(|s: &Snapshot| -> SubscriberResult {
            if s.tick > 0 {
                panic!("subscriber blew up");
            }
            Ok(())
        });
        let (good, f) = counter();
        let _good = engine.subscribe(f);

        engine.tick();
        engine.tick();
        assert_eq!(good.load(Ordering::SeqCst), 3);
        assert_eq!(engine.snapshot().tick, 2);
    }

    #[test]
    fn dropping_the_handle_unsubscribes() {
        let clock = ManualClock::new(T0);
        let engine = engine_with(test_config(10), Arc::new(MemoryStore::new()), &clock);
        let (hits, f) = counter();
        let sub = engine.subscribe(f);
        engine.tick();
        drop(sub);
        engine.tick();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(engine.subscriber_count(), 0);
    }

    #[test]
    fn cancel_and_unsubscribe_by_id() {
        let clock = ManualClock::new(T0);
        let engine = engine_with(test_config(10), Arc::new(MemoryStore::new()), &clock);
        let (_a, fa) = counter();
        let (_b, fb) = counter();
        let sa = engine.subscribe(fa);
        let id_b = engine.subscribe(fb).detach();
        assert_eq!(engine.subscriber_count(), 2);
        assert!(sa.cancel());
        assert!(engine.unsubscribe(id_b));
        assert!(!engine.unsubscribe(id_b));
        assert_eq!(engine.subscriber_count(), 0);
    }

    #[test]
    fn subscribing_from_a_callback_joins_the_next_tick() {
        let clock = ManualClock::new(T0);
        let engine = engine_with(test_config(10), Arc::new(MemoryStore::new()), &clock);
        let late_hits = Arc::new(AtomicUsize::new(0));

        let (inner_engine, inner_hits) = (engine.clone(), late_hits.clone());
        let _outer = engine.subscribe(move |s: &Snapshot| -> SubscriberResult {
            if s.tick == 1 {
                let h = inner_hits.clone();
                inner_engine
                    .subscribe(move |_: &Snapshot| -> SubscriberResult {
                        h.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .detach();
            }
            Ok(())
        });

        engine.tick();
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
        engine.tick();
        assert_eq!(late_hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn timer_drives_ticks_until_disconnect() {
        let config = FleetConfig { tick_interval_ms: 20, ..test_config(30) };
        let engine = FleetEngineBuilder::new(config, Arc::new(MemoryStore::new())).build().unwrap();
        let (tx, rx) = unbounded();
        let _sub = engine.subscribe(move |s: &Snapshot| -> SubscriberResult {
            let _ = tx.send(s.tick);
            Ok(())
        });
        engine.connect();

        let deadline = Duration::from_secs(5);
        let mut last = 0;
        while last < 3 {
            last = rx.recv_timeout(deadline).expect("timer stalled");
        }
        engine.disconnect();
        assert!(!engine.is_running());

        let frozen = engine.snapshot().tick;
        while rx.try_recv().is_ok() {}
        std::thread::sleep(Duration::from_millis(100));
        assert!(rx.try_recv().is_err());
        assert_eq!(engine.snapshot().tick, frozen);
    }

    #[test]
    fn disconnect_from_inside_a_callback_does_not_deadlock() {
        let config = FleetConfig { tick_interval_ms: 10, ..test_config(5) };
        let engine = FleetEngineBuilder::new(config, Arc::new(MemoryStore::new())).build().unwrap();
        let (tx, rx) = unbounded();
        let inner = engine.clone();
        let _sub = engine.subscribe(move |s: &Snapshot| -> SubscriberResult {
            if s.tick >= 1 {
                inner.disconnect();
                let _ = tx.send(s.tick);
            }
            Ok(())
        });
        engine.connect();
        rx.recv_timeout(Duration::from_secs(5)).expect("no tick");
        assert!(!engine.is_running());
    }

    #[test]
    fn disconnect_inside_a_manual_tick_while_the_timer_runs() {
        let config = FleetConfig { tick_interval_ms: 5, ..test_config(5) };
        let engine = FleetEngineBuilder::new(config, Arc::new(MemoryStore::new())).build().unwrap();
        let armed = Arc::new(AtomicBool::new(false));
        let (inner, flag) = (engine.clone(), armed.clone());
        let _sub = engine.subscribe(move |_: &Snapshot| -> SubscriberResult {
            let on_timer = std::thread::current().name() == Some("fleet-tick");
            if !on_timer && flag.swap(false, Ordering::SeqCst) {
                // Long enough for the timer to queue up behind this tick.
                std::thread::sleep(Duration::from_millis(50));
                inner.disconnect();
            }
            Ok(())
        });
        engine.connect();
        std::thread::sleep(Duration::from_millis(20));
        armed.store(true, Ordering::SeqCst);

        let (tx, rx) = unbounded();
        let stepper = engine.clone();
        std::thread::spawn(move || {
            let _ = tx.send(stepper.tick().tick);
        });
        let manual = rx.recv_timeout(Duration::from_secs(5)).expect("manual tick never returned");
        assert!(!engine.is_running());

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(engine.snapshot().tick, manual);
    }

    #[test]
    fn tick_inside_a_callback_is_ignored() {
        let clock = ManualClock::new(T0);
        let engine = engine_with(test_config(10), Arc::new(MemoryStore::new()), &clock);
        let nested = Arc::new(Mutex::new(Vec::new()));
        let (inner, log) = (engine.clone(), nested.clone());
        let _sub = engine.subscribe(move |s: &Snapshot| -> SubscriberResult {
            if s.tick == 1 {
                log.lock().unwrap().push(inner.tick());
            }
            Ok(())
        });

        engine.tick();
        assert_eq!(engine.snapshot().tick, 1);
        let nested = nested.lock().unwrap();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].tick, 1);
        assert_eq!(nested[0].moved, 0);
    }

    #[test]
    fn late_subscribers_see_ticks_in_order() {
        let config = FleetConfig { tick_interval_ms: 1, ..test_config(20) };
        let engine = FleetEngineBuilder::new(config, Arc::new(MemoryStore::new())).build().unwrap();
        engine.connect();

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                std::thread::spawn(move || {
                    let seen = Arc::new(Mutex::new(Vec::new()));
                    let busy = Arc::new(AtomicBool::new(false));
                    let overlapped = Arc::new(AtomicBool::new(false));
                    let (s, b, o) = (seen.clone(), busy.clone(), overlapped.clone());
                    let sub = engine.subscribe(move |snap: &Snapshot| -> SubscriberResult {
                        if b.swap(true, Ordering::SeqCst) {
                            o.store(true, Ordering::SeqCst);
                        }
                        s.lock().unwrap().push(snap.tick);
                        b.store(false, Ordering::SeqCst);
                        Ok(())
                    });
                    std::thread::sleep(Duration::from_millis(30));
                    drop(sub);
                    let ticks = seen.lock().unwrap().clone();
                    (ticks, overlapped.load(Ordering::SeqCst))
                })
            })
            .collect();

        for worker in workers {
            let (ticks, overlapped) = worker.join().unwrap();
            assert!(!ticks.is_empty());
            assert!(ticks.windows(2).all(|w| w[0] < w[1]), "out of order: {ticks:?}");
            assert!(!overlapped);
        }
        engine.disconnect();
    }

    #[test]
    fn dropping_the_engine_stops_the_timer() {
        let config = FleetConfig { tick_interval_ms: 10, ..test_config(5) };
        let engine = FleetEngineBuilder::new(config, Arc::new(MemoryStore::new())).build().unwrap();
        let (hits, f) = counter();
        engine.subscribe(f).detach();
        engine.connect();
        std::thread::sleep(Duration::from_millis(60));
        drop(engine);
        std::thread::sleep(Duration::from_millis(50));
        let settled = hits.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(hits.load(Ordering::SeqCst), settled);
    }
}
