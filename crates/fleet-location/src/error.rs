//! Error types for fleet-location.

use fleet_cache::CacheError;
use thiserror::Error;

use crate::SensorError;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location services are disabled")]
    ServiceDisabled,

    #[error("location permission denied")]
    PermissionDenied,

    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error("location cache: {0}")]
    Cache(#[from] CacheError),
}

/// Alias for `Result<T, LocationError>`.
pub type LocationResult<T> = Result<T, LocationError>;
