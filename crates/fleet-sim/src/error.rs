use fleet_cache::CacheError;
use fleet_core::FleetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Core(#[from] FleetError),

    #[error("fleet cache error: {0}")]
    Cache(#[from] CacheError),
}

pub type SimResult<T> = Result<T, SimError>;
