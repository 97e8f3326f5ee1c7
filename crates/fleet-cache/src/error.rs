//! Error types for fleet-cache.

use thiserror::Error;

/// Errors that can occur when reading or writing the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache record for {key:?} could not be decoded: {source}")]
    Decode {
        key:    String,
        source: serde_json::Error,
    },

    #[error("cache record could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("cache store lock poisoned")]
    Poisoned,
}

/// Alias for `Result<T, CacheError>`.
pub type CacheResult<T> = Result<T, CacheError>;
