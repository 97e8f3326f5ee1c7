//! A stand-in location sensor: a pedestrian wandering around a start point.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, bounded, select, tick};
use fleet_core::{Clock, FleetRng, GeoPoint, SystemClock};
use fleet_location::{
    Fix, FixCallback, PermissionStatus, Position, SensorError, SensorProvider, SensorSubscription,
    WatchOptions,
};

/// Roughly 5 m per step at city latitudes.
const STEP_DEG: f64 = 0.00005;

struct Walker {
    point: GeoPoint,
    rng:   FleetRng,
}

impl Walker {
    fn step(&mut self) -> Fix {
        self.point = self.point.offset(self.rng.jitter(STEP_DEG), self.rng.jitter(STEP_DEG));
        let accuracy = self.rng.gen_range(5.0..25.0);
        Fix::new(Position::new(self.point, Some(accuracy)), SystemClock.now())
    }
}

/// A running feed thread.  Dropping the sender ends it.
struct Feed {
    stop: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl Feed {
    fn spawn(walker: Arc<Mutex<Walker>>, options: WatchOptions, callback: FixCallback) -> Result<Self, SensorError> {
        let (stop, stop_rx) = bounded::<()>(0);
        // Sample faster than the throttle interval so the distance rule is
        // exercised too.
        let period = options.min_interval / 4;
        let join = thread::Builder::new()
            .name("sensor-feed".into())
            .spawn(move || {
                let ticker = tick(period);
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            let fix = walker.lock().unwrap_or_else(PoisonError::into_inner).step();
                            callback(fix);
                        }
                    }
                }
            })
            .map_err(|e| SensorError::Backend(e.to_string()))?;
        Ok(Self { stop: Some(stop), join: Some(join) })
    }

    fn halt(&mut self) {
        self.stop.take();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl SensorSubscription for Feed {
    fn remove(&mut self) {
        self.halt();
    }
}

impl Drop for Feed {
    fn drop(&mut self) {
        self.halt();
    }
}

pub struct SimulatedSensor {
    walker:     Arc<Mutex<Walker>>,
    permission: Mutex<PermissionStatus>,
    background: Mutex<Option<Feed>>,
}

impl SimulatedSensor {
    pub fn new(start: GeoPoint, seed: Option<u64>) -> Self {
        let walker = Walker { point: start, rng: FleetRng::from_seed_opt(seed) };
        Self {
            walker:     Arc::new(Mutex::new(walker)),
            permission: Mutex::new(PermissionStatus::Undetermined),
            background: Mutex::new(None),
        }
    }
}

impl SensorProvider for SimulatedSensor {
    fn service_enabled(&self) -> Result<bool, SensorError> {
        Ok(true)
    }

    fn permission_status(&self) -> Result<PermissionStatus, SensorError> {
        Ok(*self.permission.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn request_permission(&self) -> Result<PermissionStatus, SensorError> {
        let mut status = self.permission.lock().unwrap_or_else(PoisonError::into_inner);
        *status = PermissionStatus::Granted;
        Ok(*status)
    }

    fn request_background_permission(&self) -> Result<PermissionStatus, SensorError> {
        Ok(PermissionStatus::Granted)
    }

    fn current_fix(&self) -> Result<Fix, SensorError> {
        Ok(self.walker.lock().unwrap_or_else(PoisonError::into_inner).step())
    }

    fn watch(
        &self,
        options:  WatchOptions,
        callback: FixCallback,
    ) -> Result<Box<dyn SensorSubscription>, SensorError> {
        Ok(Box::new(Feed::spawn(Arc::clone(&self.walker), options, callback)?))
    }

    fn start_background_updates(&self, options: WatchOptions, callback: FixCallback) -> Result<(), SensorError> {
        let feed = Feed::spawn(Arc::clone(&self.walker), options, callback)?;
        *self.background.lock().unwrap_or_else(PoisonError::into_inner) = Some(feed);
        Ok(())
    }

    fn stop_background_updates(&self) -> Result<(), SensorError> {
        let feed = self.background.lock().unwrap_or_else(PoisonError::into_inner).take();
        drop(feed);
        Ok(())
    }

    fn background_updates_running(&self) -> Result<bool, SensorError> {
        Ok(self.background.lock().unwrap_or_else(PoisonError::into_inner).is_some())
    }
}
