//! Timestamped cache records and the typed wrapper that stores them.

use std::borrow::Borrow;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use fleet_core::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{CacheError, CacheResult, KeyValueStore};

// ── CacheRecord ───────────────────────────────────────────────────────────────

/// A payload plus the moment it was captured.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    pub payload:     T,
    pub captured_at: Timestamp,
}

impl<T> CacheRecord<T> {
    pub fn new(payload: T, captured_at: Timestamp) -> Self {
        Self { payload, captured_at }
    }

    /// Age of the record at `now`.  Clamped at zero for records stamped in
    /// the future.
    pub fn age_at(&self, now: Timestamp) -> Duration {
        let ms = now.millis_since(self.captured_at).max(0) as u64;
        Duration::from_millis(ms)
    }

    /// A record is stale once its age strictly exceeds `window`.
    pub fn is_fresh(&self, now: Timestamp, window: Duration) -> bool {
        self.age_at(now) <= window
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

/// Serialises exactly like `CacheRecord<T>` but borrows the payload.
#[derive(Serialize)]
struct RecordRef<'a, P: ?Sized> {
    payload:     &'a P,
    captured_at: Timestamp,
}

// ── TypedCache ────────────────────────────────────────────────────────────────

/// A [`CacheRecord<T>`] persisted as JSON under one key of a [`KeyValueStore`].
pub struct TypedCache<T> {
    store:   Arc<dyn KeyValueStore>,
    key:     String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for TypedCache<T> {
    fn clone(&self) -> Self {
        Self {
            store:   Arc::clone(&self.store),
            key:     self.key.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> TypedCache<T> {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self { store, key: key.into(), _marker: PhantomData }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Serialise and store `record`, overwriting any previous value.
    pub fn save(&self, record: &CacheRecord<T>) -> CacheResult<()> {
        let text = serde_json::to_string(record).map_err(CacheError::Encode)?;
        self.store.set(&self.key, &text)
    }

    /// Store a borrowed payload without cloning it into a `CacheRecord<T>`
    /// first.  The encoding is identical to [`save`](Self::save).
    pub fn save_payload<P>(&self, payload: &P, captured_at: Timestamp) -> CacheResult<()>
    where
        P: Serialize + ?Sized,
        T: Borrow<P>,
    {
        let record = RecordRef { payload, captured_at };
        let text = serde_json::to_string(&record).map_err(CacheError::Encode)?;
        self.store.set(&self.key, &text)
    }

    /// Read the stored record regardless of age.
    pub fn load(&self) -> CacheResult<Option<CacheRecord<T>>> {
        let Some(text) = self.store.get(&self.key)? else {
            return Ok(None);
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| CacheError::Decode { key: self.key.clone(), source })
    }

    /// Read the stored record only if it is fresh at `now`.
    pub fn load_fresh(&self, now: Timestamp, window: Duration) -> CacheResult<Option<CacheRecord<T>>> {
        let record = self.load()?;
        Ok(match record {
            Some(r) if r.is_fresh(now, window) => Some(r),
            Some(r) => {
                tracing::debug!(
                    key = %self.key,
                    age_ms = r.age_at(now).as_millis() as u64,
                    "cache_record_stale"
                );
                None
            }
            None => None,
        })
    }

    pub fn clear(&self) -> CacheResult<()> {
        self.store.remove(&self.key)
    }
}
