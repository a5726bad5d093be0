//! Ports consumed by the bootstrap subsystem.
//!
//! External collaborators (identity provider, profile store, durable
//! key/value storage, clock) are reached only through these traits so the
//! state machine stays testable against fakes.

pub mod auth_cache;
pub mod clock;
pub mod identity;
pub mod key_value;
pub mod profile_store;

pub use auth_cache::AuthCachePort;
pub use clock::ClockPort;
pub use identity::IdentityPort;
pub use key_value::KeyValuePort;
pub use profile_store::ProfileStorePort;
