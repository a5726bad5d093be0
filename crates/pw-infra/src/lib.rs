//! Infrastructure adapters: snapshot cache, key/value stores and clock.

pub mod cache;
pub mod kv;
pub mod time;

pub use cache::AuthSnapshotCache;
pub use kv::{FileKeyValueStore, InMemoryKeyValueStore};
pub use time::SystemClock;
