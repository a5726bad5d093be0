//! Auth snapshot cache port.

use crate::boot::CachedAuthSnapshot;
use crate::identity::{Identity, Session};
use crate::profile::Profile;

/// Time-boxed cache of the last successfully resolved identity + profile.
///
/// Written only after a fully successful bootstrap; read at the start of
/// every attempt. Operations are synchronous (single-client, local store)
/// and failures degrade to a miss rather than surfacing.
pub trait AuthCachePort: Send + Sync {
    /// Persist a fresh snapshot captured from a successful bootstrap.
    fn set(&self, identity: &Identity, profile: &Profile, session: &Session)
        -> anyhow::Result<()>;

    /// Return the snapshot if it passes both freshness checks (wall-clock
    /// TTL and embedded session expiry); an expired entry is implicitly
    /// cleared and `None` returned.
    fn get(&self) -> Option<CachedAuthSnapshot>;

    /// Delete the persisted entry.
    fn clear(&self);

    /// Mark the existing entry unusable without deleting it.
    fn invalidate(&self);

    /// Whether a usable snapshot currently exists. Does not clear.
    fn is_valid(&self) -> bool;
}
