//! Durable key/value store port.
//!
//! Reads and writes are synchronous; the only consumer is the auth snapshot
//! cache, which is read once at the start of a bootstrap attempt.

pub trait KeyValuePort: Send + Sync {
    /// Load the value stored under `key`, if any.
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Store `value` under `key`. Must be idempotent (overwrite if exists).
    fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Remove the value stored under `key`. Removing a missing key is not
    /// an error.
    fn remove_item(&self, key: &str) -> anyhow::Result<()>;
}
