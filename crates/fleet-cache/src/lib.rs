//! `fleet-cache` — durable last-known-state storage for the live fleet tracker.
//!
//! Storage is a plain string-keyed store ([`KeyValueStore`]); typed,
//! timestamped records ([`CacheRecord`]) are layered on top with
//! [`TypedCache`].  The fleet engine and the location service each own one
//! typed cache under their own key.
//!
//! | Backend         | Feature   | Storage                                        |
//! |-----------------|-----------|------------------------------------------------|
//! | [`MemoryStore`] | *(none)*  | in-process `HashMap`                           |
//! | [`FileStore`]   | *(none)*  | one `<key>.json` file per key, atomic replace  |
//! | `SqliteStore`   | `sqlite`  | single `kv` table in `cache.db`                |
//!
//! # Usage
//!
//! ```rust,ignore
//! use fleet_cache::{CacheRecord, FileStore, TypedCache};
//!
//! let store = Arc::new(FileStore::new(Path::new("./cache"))?);
//! let cache: TypedCache<Vec<Driver>> = TypedCache::new(store, "driver_positions_cache");
//! cache.save(&CacheRecord::new(drivers, clock.now()))?;
//! let fresh = cache.load()?.filter(|r| r.is_fresh(clock.now(), window));
//! ```

pub mod error;
pub mod file;
pub mod memory;
pub mod record;
pub mod store;

#[cfg(feature = "sqlite")]
pub mod sqlite;


pub use error::{CacheError, CacheResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::{CacheRecord, TypedCache};
pub use store::KeyValueStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
