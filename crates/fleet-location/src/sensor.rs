//! The platform seam.
//!
//! A `SensorProvider` wraps whatever actually produces fixes: an OS
//! location API, a GPS daemon, a replayed trace.  Every call may fail; the
//! service decides what a failure means.

use thiserror::Error;

use crate::{Fix, PermissionStatus, WatchOptions};

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("location unavailable: {0}")]
    Unavailable(String),

    #[error("sensor returned an invalid fix")]
    InvalidFix,

    #[error("sensor backend error: {0}")]
    Backend(String),
}

/// Receives fixes from a watch or from background updates.  May be called
/// from any thread.
pub type FixCallback = Box<dyn Fn(Fix) + Send + Sync>;

/// A live sensor watch.  Removing it stops further callbacks.
pub trait SensorSubscription: Send {
    fn remove(&mut self);
}

pub trait SensorProvider: Send + Sync + 'static {
    fn service_enabled(&self) -> Result<bool, SensorError>;

    fn permission_status(&self) -> Result<PermissionStatus, SensorError>;

    /// Ask for foreground permission and return the resulting status.
    fn request_permission(&self) -> Result<PermissionStatus, SensorError>;

    fn request_background_permission(&self) -> Result<PermissionStatus, SensorError>;

    /// A single live fix.
    fn current_fix(&self) -> Result<Fix, SensorError>;

    fn watch(
        &self,
        options:  WatchOptions,
        callback: FixCallback,
    ) -> Result<Box<dyn SensorSubscription>, SensorError>;

    fn start_background_updates(&self, options: WatchOptions, callback: FixCallback) -> Result<(), SensorError>;

    fn stop_background_updates(&self) -> Result<(), SensorError>;

    fn background_updates_running(&self) -> Result<bool, SensorError>;
}
