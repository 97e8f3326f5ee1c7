//! The `FleetEngine` and its tick.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, ThreadId};

use fleet_cache::CacheRecord;
use fleet_core::{Clock, Driver, DriverId, FleetRng, Timestamp};
use rustc_hash::FxHashMap;
use tracing::{debug, error, info, warn};

use crate::generator::{SPEED_RANGE_KMH, generate};
use crate::persistence::FleetCache;
use crate::subscriber::{FleetSubscriber, Subscription, SubscriptionId};
use crate::timer::TimerHandle;
use crate::{FleetConfig, SimResult, Snapshot};

// ── Public state/report types ─────────────────────────────────────────────────

/// Lifecycle of the engine.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum EngineState {
    /// No population loaded yet.
    Uninitialized,
    /// Population loaded, timer stopped (before `connect` or after `disconnect`).
    Seeded,
    /// Timer active.
    Running,
}

/// What one tick did.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct TickReport {
    pub tick:      u64,
    /// Indices drawn by the sampler, offline drivers included.
    pub selected:  usize,
    /// Drivers whose position actually changed.
    pub moved:     usize,
    pub persisted: bool,
}

// ── Shared state ──────────────────────────────────────────────────────────────

/// The authoritative, mutable population.  Only touched under `state`.
struct FleetState {
    drivers: Vec<Driver>,
    rng:     FleetRng,
    tick:    u64,
}

/// What readers see: the last published snapshot and its id index.
struct Published {
    snapshot: Snapshot,
    index:    FxHashMap<DriverId, usize>,
}

impl Published {
    fn new(snapshot: Snapshot) -> Self {
        let index = snapshot
            .drivers
            .iter()
            .enumerate()
            .map(|(slot, d)| (d.id, slot))
            .collect();
        Self { snapshot, index }
    }
}

pub(crate) struct EngineShared {
    config:      FleetConfig,
    clock:       Arc<dyn Clock>,
    cache:       FleetCache,
    /// Seeding and mutation.
    state:       Mutex<FleetState>,
    /// Held for a whole tick, notification included, so ticks never overlap.
    /// Seeding deliveries from `connect` and `subscribe` take it too.
    tick_lock:   Mutex<()>,
    /// Thread currently holding `tick_lock`.
    tick_owner:  Mutex<Option<ThreadId>>,
    published:   RwLock<Published>,
    subscribers: Mutex<Vec<(SubscriptionId, Arc<dyn FleetSubscriber>)>>,
    next_sub_id: AtomicU64,
    timer:       Mutex<Option<TimerHandle>>,
    generations: AtomicUsize,
}

impl EngineShared {
    pub(crate) fn remove_subscriber(&self, id: SubscriptionId) -> bool {
        let mut subs = lock(&self.subscribers);
        let before = subs.len();
        subs.retain(|(sub_id, _)| *sub_id != id);
        subs.len() != before
    }

    /// `true` on the thread currently inside a tick or a seeding delivery,
    /// i.e. when called from a subscriber callback.
    fn holds_tick_lock(&self) -> bool {
        *lock(&self.tick_owner) == Some(thread::current().id())
    }

    /// Take the tick lock, or `None` if this thread already holds it.
    fn enter_tick(&self) -> Option<TickGuard<'_>> {
        if self.holds_tick_lock() {
            return None;
        }
        let serial = lock(&self.tick_lock);
        *lock(&self.tick_owner) = Some(thread::current().id());
        Some(TickGuard { owner: &self.tick_owner, _serial: serial })
    }
}

/// Clears the owner before the tick lock is released.
struct TickGuard<'a> {
    owner:   &'a Mutex<Option<ThreadId>>,
    _serial: MutexGuard<'a, ()>,
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        *lock(self.owner) = None;
    }
}

impl Drop for EngineShared {
    fn drop(&mut self) {
        // Dropping the stop sender ends the timer loop.  Never join here: the
        // last strong reference may be released on the timer thread itself.
        if let Some(timer) = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
            timer.detach();
        }
    }
}

/// Poison-tolerant lock: a panicking subscriber must not wedge the engine.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── FleetEngine ───────────────────────────────────────────────────────────────

/// Owns the population, runs the update timer, and fans snapshots out to
/// subscribers.
///
/// `FleetEngine` is a handle: clones share the same engine.  Build one with
/// [`FleetEngineBuilder`][crate::FleetEngineBuilder] at the composition root
/// and pass clones to whoever needs them.
///
/// # Concurrency
///
/// - All population mutation happens in [`tick`](Self::tick), serialised by
///   an internal tick lock, so there is exactly one writer.
/// - Each tick mutates a private copy and then publishes a fresh immutable
///   [`Snapshot`]; readers never observe a half-applied tick.
/// - The subscriber list is copied before dispatch, so subscribing or
///   unsubscribing during a notification is safe.  A subscriber added
///   mid-notification receives the next snapshot.
#[derive(Clone)]
pub struct FleetEngine {
    pub(crate) shared: Arc<EngineShared>,
}

impl FleetEngine {
    pub(crate) fn from_parts(
        config: FleetConfig,
        clock:  Arc<dyn Clock>,
        cache:  FleetCache,
        rng:    FleetRng,
    ) -> Self {
        let shared = EngineShared {
            config,
            clock,
            cache,
            state:       Mutex::new(FleetState { drivers: Vec::new(), rng, tick: 0 }),
            tick_lock:   Mutex::new(()),
            tick_owner:  Mutex::new(None),
            published:   RwLock::new(Published::new(Snapshot::empty())),
            subscribers: Mutex::new(Vec::new()),
            next_sub_id: AtomicU64::new(0),
            timer:       Mutex::new(None),
            generations: AtomicUsize::new(0),
        };
        FleetEngine { shared: Arc::new(shared) }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Load the population (cache first, generator as fallback), notify all
    /// subscribers, and start the timer.
    ///
    /// Does nothing if the timer is already running.  Never fails: storage
    /// errors are logged and the engine falls back to generation.
    pub fn connect(&self) {
        if self.is_running() {
            debug!("fleet_connect_already_running");
            return;
        }
        {
            let _serial = self.shared.enter_tick();
            self.ensure_seeded();
            let snapshot = self.snapshot();
            self.dispatch(&snapshot, &self.subscriber_list());
        }
        self.start_timer();
    }

    /// Stop the timer.  The population and subscribers are kept, so a later
    /// [`connect`](Self::connect) resumes where this left off.
    ///
    /// Waits for the timer thread to exit, except when called from inside a
    /// subscriber callback: the timer may be queued behind the tick that is
    /// running the callback, so it is only signalled and skips that tick.
    pub fn disconnect(&self) {
        let timer = lock(&self.shared.timer).take();
        if let Some(timer) = timer {
            if self.shared.holds_tick_lock() {
                timer.detach();
            } else {
                timer.stop();
            }
            info!("fleet_disconnected");
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.shared.timer).is_some()
    }

    pub fn state(&self) -> EngineState {
        if self.is_running() {
            EngineState::Running
        } else if self.snapshot().is_empty() {
            EngineState::Uninitialized
        } else {
            EngineState::Seeded
        }
    }

    // ── Subscribers ───────────────────────────────────────────────────────

    /// Register `subscriber` and hand it the current population.
    ///
    /// If no population is loaded yet, one is seeded right here (cache
    /// first, then the generator).  Seeding is serialised, so concurrent
    /// `subscribe`/`connect` calls seed exactly once.
    ///
    /// The first delivery and the registration happen between ticks, so the
    /// subscriber sees ticks in order and never runs on two threads at once.
    pub fn subscribe<S: FleetSubscriber>(&self, subscriber: S) -> Subscription {
        let id = SubscriptionId(self.shared.next_sub_id.fetch_add(1, Ordering::Relaxed));
        let subscriber: Arc<dyn FleetSubscriber> = Arc::new(subscriber);
        {
            let _serial = self.shared.enter_tick();
            self.ensure_seeded();
            let snapshot = self.snapshot();
            self.dispatch(&snapshot, &[(id, Arc::clone(&subscriber))]);
            lock(&self.shared.subscribers).push((id, subscriber));
        }
        debug!(subscription = id.0, "fleet_subscribed");

        Subscription::new(id, Arc::downgrade(&self.shared))
    }

    /// Remove a subscription by id.  Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.remove_subscriber(id)
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared.subscribers).len()
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.shared
            .published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .clone()
    }

    /// Look up a driver in the latest snapshot.  `None` if absent.
    pub fn get_by_id(&self, id: DriverId) -> Option<Driver> {
        let published = self.shared.published.read().unwrap_or_else(PoisonError::into_inner);
        published
            .index
            .get(&id)
            .and_then(|&slot| published.snapshot.drivers.get(slot))
            .cloned()
    }

    /// How many times the generator has produced a population.
    pub fn generation_count(&self) -> usize {
        self.shared.generations.load(Ordering::SeqCst)
    }

    /// The stored fleet record regardless of age, for painting last-known
    /// drivers before `connect` completes.
    pub fn cached_snapshot(&self) -> SimResult<Option<CacheRecord<Vec<Driver>>>> {
        Ok(self.shared.cache.load_raw()?)
    }

    pub fn config(&self) -> &FleetConfig {
        &self.shared.config
    }

    // ── Tick ──────────────────────────────────────────────────────────────

    /// Run one mutate–persist–notify cycle.
    ///
    /// Called by the timer every `tick_interval`.  Public so tests and
    /// manual drivers can step the engine deterministically.  Called from
    /// inside a subscriber callback it does nothing and reports the tick in
    /// progress.
    pub fn tick(&self) -> TickReport {
        let Some(_serial) = self.shared.enter_tick() else {
            warn!("fleet_tick_reentrant");
            return TickReport { tick: self.snapshot().tick, ..TickReport::default() };
        };
        self.step()
    }

    /// Timer entry point: tick unless `stopped` reports a disconnect that
    /// arrived while this thread waited for the tick lock.
    pub(crate) fn timer_tick(&self, stopped: impl FnOnce() -> bool) {
        let Some(_serial) = self.shared.enter_tick() else { return };
        if stopped() {
            return;
        }
        self.step();
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Mutate, persist, publish, notify.  Caller holds the tick lock.
    fn step(&self) -> TickReport {
        let shared = &self.shared;
        let config = &shared.config;

        let (report, snapshot) = {
            let mut state = lock(&shared.state);
            let FleetState { drivers, rng, tick } = &mut *state;
            if drivers.is_empty() {
                return TickReport { tick: *tick, ..TickReport::default() };
            }

            *tick += 1;
            let now = shared.clock.now();

            let picked = rng.sample_indices(drivers.len(), config.update_count(drivers.len()));
            let mut moved = 0;
            for &i in &picked {
                let driver = &mut drivers[i];
                if !driver.status.is_movable() {
                    continue;
                }
                let step = config.walk_step_deg;
                let point = driver.point.offset(rng.jitter(step), rng.jitter(step));
                driver.set_speed_for_status(rng.gen_range(SPEED_RANGE_KMH));
                driver.record_move(point, now);
                moved += 1;
            }

            let persisted = rng.gen_bool(config.persist_probability)
                && shared.cache.persist(drivers, now);

            let snapshot = self.publish(drivers, *tick, now);
            let report = TickReport { tick: *tick, selected: picked.len(), moved, persisted };
            (report, snapshot)
        };

        debug!(
            tick = report.tick,
            selected = report.selected,
            moved = report.moved,
            persisted = report.persisted,
            "fleet_tick"
        );

        self.dispatch(&snapshot, &self.subscriber_list());
        report
    }

    /// Load a population if none is loaded.  Returns `true` if the generator
    /// ran.
    fn ensure_seeded(&self) -> bool {
        if !self.snapshot().is_empty() {
            return false;
        }

        let shared = &self.shared;
        let mut state = lock(&shared.state);
        if !state.drivers.is_empty() {
            return false;
        }

        let now = shared.clock.now();
        if let Some(drivers) = shared.cache.restore(now, shared.config.freshness_window()) {
            state.drivers = drivers;
            self.publish(&state.drivers, state.tick, now);
            return false;
        }

        let config = &shared.config;
        let FleetState { drivers, rng, tick } = &mut *state;
        *drivers = generate(config.driver_count, &config.regions, config.jitter_deg, rng);
        shared.generations.fetch_add(1, Ordering::SeqCst);
        info!(
            drivers = drivers.len(),
            regions = config.regions.len(),
            "fleet_generated"
        );

        shared.cache.persist(drivers, now);
        self.publish(drivers, *tick, now);
        true
    }

    fn publish(&self, drivers: &[Driver], tick: u64, now: Timestamp) -> Snapshot {
        let snapshot = Snapshot { tick, taken_at: now, drivers: Arc::from(drivers) };
        let published = Published::new(snapshot.clone());
        *self.shared.published.write().unwrap_or_else(PoisonError::into_inner) = published;
        snapshot
    }

    fn subscriber_list(&self) -> Vec<(SubscriptionId, Arc<dyn FleetSubscriber>)> {
        lock(&self.shared.subscribers).clone()
    }

    /// Deliver `snapshot` to each subscriber in turn.  A failing or panicking
    /// subscriber is logged and skipped.
    fn dispatch(&self, snapshot: &Snapshot, subscribers: &[(SubscriptionId, Arc<dyn FleetSubscriber>)]) {
        for (id, subscriber) in subscribers {
            match catch_unwind(AssertUnwindSafe(|| subscriber.on_snapshot(snapshot))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(subscription = id.0, tick = snapshot.tick, error = %err, "subscriber_failed");
                }
                Err(panic) => {
                    error!(
                        subscription = id.0,
                        tick = snapshot.tick,
                        panic = panic_message(panic.as_ref()),
                        "subscriber_panicked"
                    );
                }
            }
        }
    }

    fn start_timer(&self) {
        let mut timer = lock(&self.shared.timer);
        if timer.is_some() {
            return;
        }
        let period = self.shared.config.tick_interval();
        match TimerHandle::spawn(Arc::downgrade(&self.shared), period) {
            Ok(handle) => {
                *timer = Some(handle);
                info!(period_ms = period.as_millis() as u64, "fleet_connected");
            }
            Err(err) => error!(error = %err, "fleet_timer_spawn_failed"),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

impl std::fmt::Debug for FleetEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetEngine")
            .field("state", &self.state())
            .field("drivers", &self.snapshot().len())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
