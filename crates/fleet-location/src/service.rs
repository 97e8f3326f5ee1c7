//! `LocationService` and watch handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use fleet_cache::KeyValueStore;
use tracing::{debug, error, info, warn};

use crate::{
    Fix, LocationCache, LocationError, LocationResult, PermissionStatus, Position, SensorError,
    SensorProvider, SensorSubscription, Throttle, WatchOptions,
};

/// Resolves the user's position from a sensor, falling back to the last
/// persisted fix.
pub struct LocationService<S> {
    sensor: Arc<S>,
    cache:  LocationCache,
}

impl<S> Clone for LocationService<S> {
    fn clone(&self) -> Self {
        Self { sensor: Arc::clone(&self.sensor), cache: self.cache.clone() }
    }
}

impl<S: SensorProvider> LocationService<S> {
    pub fn new(sensor: Arc<S>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { sensor, cache: LocationCache::new(store) }
    }

    pub fn sensor(&self) -> &Arc<S> {
        &self.sensor
    }

    // ── One-shot ──────────────────────────────────────────────────────────

    /// Best available position: a live fix if the sensor can give one,
    /// otherwise the last cached fix, otherwise `None`.
    ///
    /// A live fix is persisted before it is returned.
    pub fn current_position(&self) -> Option<Position> {
        match self.sensor.service_enabled() {
            Ok(true) => {}
            Ok(false) => {
                info!("location_service_disabled");
                return self.fallback();
            }
            Err(error) => {
                warn!(error = %error, "location_service_check_failed");
                return self.fallback();
            }
        }

        match self.foreground_permission() {
            Ok(PermissionStatus::Granted) => {}
            Ok(status) => {
                info!(status = ?status, "location_permission_denied");
                return self.fallback();
            }
            Err(error) => {
                warn!(error = %error, "location_permission_check_failed");
                return self.fallback();
            }
        }

        match self.live_fix() {
            Ok(fix) => {
                self.cache.store(&fix);
                Some(fix.position)
            }
            Err(error) => {
                info!(error = %error, "location_fix_unavailable");
                self.fallback()
            }
        }
    }

    /// Ask for location access.  `true` once services are on and foreground
    /// permission is granted; background permission is requested too but
    /// its outcome does not matter.
    pub fn request_permissions(&self) -> bool {
        match self.sensor.service_enabled() {
            Ok(true) => {}
            Ok(false) => {
                warn!("location_service_disabled");
                return false;
            }
            Err(error) => {
                error!(error = %error, "location_service_check_failed");
                return false;
            }
        }

        match self.sensor.request_permission() {
            Ok(PermissionStatus::Granted) => {}
            Ok(status) => {
                warn!(status = ?status, "location_permission_denied");
                return false;
            }
            Err(error) => {
                error!(error = %error, "location_permission_request_failed");
                return false;
            }
        }

        match self.sensor.request_background_permission() {
            Ok(status) => debug!(status = ?status, "location_background_permission"),
            Err(error) => debug!(error = %error, "location_background_permission_unavailable"),
        }
        true
    }

    /// The last persisted fix, any age.
    pub fn cached_position(&self) -> LocationResult<Option<Fix>> {
        Ok(self.cache.load()?)
    }

    // ── Streams ───────────────────────────────────────────────────────────

    /// Stream position updates to `callback`, at most one per 10 s unless
    /// the user has moved 10 m.  Every delivered fix is persisted first.
    ///
    /// Fails if services are disabled or permission is refused.  The stream
    /// runs until the returned handle is cancelled or dropped.
    pub fn watch<F>(&self, callback: F) -> LocationResult<WatchHandle>
    where
        F: Fn(Position) + Send + Sync + 'static,
    {
        self.ensure_ready()?;

        let cancelled = Arc::new(AtomicBool::new(false));
        let throttle = Mutex::new(Throttle::new(WatchOptions::FOREGROUND));
        let cache = self.cache.clone();
        let flag = Arc::clone(&cancelled);

        let forward = move |fix: Fix| {
            if flag.load(Ordering::Acquire) {
                return;
            }
            if !fix.position.is_valid() {
                debug!("location_watch_invalid_fix");
                return;
            }
            let admitted = throttle.lock().unwrap_or_else(PoisonError::into_inner).admit(&fix);
            if !admitted {
                return;
            }
            cache.store(&fix);
            callback(fix.position);
        };

        let subscription = self.sensor.watch(WatchOptions::FOREGROUND, Box::new(forward))?;
        info!("location_watch_started");
        Ok(WatchHandle { cancelled, subscription: Some(subscription) })
    }

    /// Keep persisting fixes while the app is not in the foreground
    /// (60 s or 50 m).  Does nothing if already running.
    ///
    /// Errors are returned for the caller to log; they never affect
    /// `current_position` or `watch`.
    pub fn start_background_tracking(&self) -> LocationResult<()> {
        let result = self.try_start_background();
        if let Err(error) = &result {
            error!(error = %error, "location_background_start_failed");
        }
        result
    }

    pub fn stop_background_tracking(&self) -> LocationResult<()> {
        let result = (|| -> Result<(), SensorError> {
            if self.sensor.background_updates_running()? {
                self.sensor.stop_background_updates()?;
                info!("location_background_stopped");
            }
            Ok(())
        })();
        if let Err(error) = &result {
            error!(error = %error, "location_background_stop_failed");
        }
        result.map_err(LocationError::from)
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn fallback(&self) -> Option<Position> {
        match self.cache.load_or_none() {
            Some(fix) => {
                info!(captured_at = fix.timestamp.as_millis(), "location_using_cached");
                Some(fix.position)
            }
            None => {
                info!("location_unavailable");
                None
            }
        }
    }

    /// Current foreground permission, asking once if not yet granted.
    fn foreground_permission(&self) -> Result<PermissionStatus, SensorError> {
        match self.sensor.permission_status()? {
            PermissionStatus::Granted => Ok(PermissionStatus::Granted),
            _ => self.sensor.request_permission(),
        }
    }

    fn live_fix(&self) -> Result<Fix, SensorError> {
        let fix = self.sensor.current_fix()?;
        if fix.position.is_valid() { Ok(fix) } else { Err(SensorError::InvalidFix) }
    }

    fn ensure_ready(&self) -> LocationResult<()> {
        if !self.sensor.service_enabled()? {
            return Err(LocationError::ServiceDisabled);
        }
        if !self.foreground_permission()?.is_granted() {
            return Err(LocationError::PermissionDenied);
        }
        Ok(())
    }

    fn try_start_background(&self) -> LocationResult<()> {
        if self.sensor.background_updates_running()? {
            return Ok(());
        }
        let cache = self.cache.clone();
        let persist = move |fix: Fix| {
            if fix.position.is_valid() {
                cache.store(&fix);
            }
        };
        self.sensor
            .start_background_updates(WatchOptions::BACKGROUND, Box::new(persist))?;
        info!("location_background_started");
        Ok(())
    }
}

// ── WatchHandle ───────────────────────────────────────────────────────────────

/// Owns a running watch.  Cancelling (or dropping) removes the sensor
/// subscription and discards any fix the sensor delivers afterwards.
#[must_use = "dropping a WatchHandle stops the watch"]
pub struct WatchHandle {
    cancelled:    Arc<AtomicBool>,
    subscription: Option<Box<dyn SensorSubscription>>,
}

impl WatchHandle {
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(mut subscription) = self.subscription.take() {
            subscription.remove();
            info!("location_watch_stopped");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle").field("cancelled", &self.is_cancelled()).finish()
    }
}
