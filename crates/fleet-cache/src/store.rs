//! The `KeyValueStore` trait implemented by all cache backends.

use crate::CacheResult;

/// A durable string-keyed store.
///
/// Implementations must be shareable across threads: the engine writes from
/// its timer thread while the location watch writes from the sensor's
/// callback thread.  A failed call is a transient condition; callers log it
/// and carry on with a degraded fallback.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` if absent.
    fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Insert or overwrite the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> CacheResult<()>;

    /// Delete `key`.  Removing an absent key is not an error.
    fn remove(&self, key: &str) -> CacheResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> CacheResult<()> {
        (**self).remove(key)
    }
}
