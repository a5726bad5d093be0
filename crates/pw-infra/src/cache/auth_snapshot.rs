//! JSON-over-key/value implementation of the auth snapshot cache.
//!
//! Every failure mode on the read path degrades to a miss: the bootstrap
//! then resolves the session over the network as if nothing were cached.

use std::sync::Arc;

use tracing::{debug, warn};

use pw_core::boot::CachedAuthSnapshot;
use pw_core::identity::{Identity, Session};
use pw_core::ports::{AuthCachePort, ClockPort, KeyValuePort};
use pw_core::profile::Profile;

const SNAPSHOT_KEY: &str = "platewise.auth_snapshot";

pub struct AuthSnapshotCache {
    store: Arc<dyn KeyValuePort>,
    clock: Arc<dyn ClockPort>,
}

impl AuthSnapshotCache {
    pub fn new(store: Arc<dyn KeyValuePort>, clock: Arc<dyn ClockPort>) -> Self {
        Self { store, clock }
    }

    /// Load the raw entry without freshness checks. Unreadable or corrupt
    /// payloads are dropped from the store and reported as absent.
    fn load(&self) -> Option<CachedAuthSnapshot> {
        let raw = match self.store.get_item(SNAPSHOT_KEY) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(error = %err, "auth snapshot read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(error = %err, "auth snapshot corrupt, dropping entry");
                self.clear();
                None
            }
        }
    }

    fn write(&self, snapshot: &CachedAuthSnapshot) -> anyhow::Result<()> {
        let raw = serde_json::to_string(snapshot)?;
        self.store.set_item(SNAPSHOT_KEY, &raw)
    }
}

impl AuthCachePort for AuthSnapshotCache {
    fn set(
        &self,
        identity: &Identity,
        profile: &Profile,
        session: &Session,
    ) -> anyhow::Result<()> {
        let snapshot = CachedAuthSnapshot::capture(
            identity.clone(),
            profile.clone(),
            session,
            self.clock.now(),
        );
        self.write(&snapshot)?;
        debug!(user_id = %identity.id, "auth snapshot written");
        Ok(())
    }

    fn get(&self) -> Option<CachedAuthSnapshot> {
        let snapshot = self.load()?;
        if snapshot.is_usable(self.clock.now()) {
            Some(snapshot)
        } else {
            debug!("auth snapshot stale, dropping entry");
            self.clear();
            None
        }
    }

    fn clear(&self) {
        if let Err(err) = self.store.remove_item(SNAPSHOT_KEY) {
            warn!(error = %err, "auth snapshot removal failed");
        }
    }

    fn invalidate(&self) {
        if let Some(mut snapshot) = self.load() {
            snapshot.valid = false;
            if let Err(err) = self.write(&snapshot) {
                warn!(error = %err, "auth snapshot invalidation failed");
            }
        }
    }

    fn is_valid(&self) -> bool {
        self.load()
            .map(|snapshot| snapshot.is_usable(self.clock.now()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::InMemoryKeyValueStore;
    use chrono::{DateTime, Duration, Utc};
    use pw_core::boot::SNAPSHOT_TTL_SECS;
    use pw_core::identity::UserId;
    use std::sync::Mutex;

    struct AdjustableClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl AdjustableClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Utc::now()),
            })
        }

        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    impl ClockPort for AdjustableClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn identity() -> Identity {
        Identity {
            id: UserId::new("u1"),
            email: "u1@example.com".into(),
            email_verified: true,
        }
    }

    fn profile() -> Profile {
        Profile {
            user_id: UserId::new("u1"),
            display_name: "u1".into(),
            onboarding_complete: true,
            fields: Default::default(),
        }
    }

    fn session(now: DateTime<Utc>) -> Session {
        Session {
            identity: identity(),
            access_token: "tok".into(),
            expires_at: now + Duration::hours(1),
        }
    }

    fn build() -> (AuthSnapshotCache, Arc<InMemoryKeyValueStore>, Arc<AdjustableClock>) {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let clock = AdjustableClock::new();
        let cache = AuthSnapshotCache::new(store.clone(), clock.clone());
        (cache, store, clock)
    }

    #[test]
    fn empty_store_is_a_miss() {
        let (cache, _, _) = build();
        assert!(cache.get().is_none());
        assert!(!cache.is_valid());
    }

    #[test]
    fn fresh_snapshot_round_trips() {
        let (cache, _, clock) = build();
        cache
            .set(&identity(), &profile(), &session(clock.now()))
            .unwrap();

        let snapshot = cache.get().unwrap();
        assert_eq!(snapshot.identity.id, UserId::new("u1"));
        assert!(snapshot.profile.onboarding_complete);
        assert!(cache.is_valid());
    }

    #[test]
    fn snapshot_past_ttl_is_dropped_on_read() {
        let (cache, store, clock) = build();
        cache
            .set(&identity(), &profile(), &session(clock.now()))
            .unwrap();

        clock.advance(Duration::seconds(SNAPSHOT_TTL_SECS + 1));

        assert!(cache.get().is_none());
        // Implicitly cleared, not just hidden.
        assert_eq!(store.get_item("platewise.auth_snapshot").unwrap(), None);
    }

    #[test]
    fn snapshot_with_expired_session_is_a_miss() {
        let (cache, _, clock) = build();
        let mut expiring = session(clock.now());
        expiring.expires_at = clock.now() + Duration::seconds(30);
        cache.set(&identity(), &profile(), &expiring).unwrap();

        clock.advance(Duration::seconds(31));
        assert!(cache.get().is_none());
    }

    #[test]
    fn invalidate_keeps_the_entry_but_hides_it() {
        let (cache, store, clock) = build();
        cache
            .set(&identity(), &profile(), &session(clock.now()))
            .unwrap();

        cache.invalidate();

        assert!(!cache.is_valid());
        assert!(store
            .get_item("platewise.auth_snapshot")
            .unwrap()
            .is_some());
        assert!(cache.get().is_none());
    }

    #[test]
    fn clear_removes_the_entry() {
        let (cache, store, clock) = build();
        cache
            .set(&identity(), &profile(), &session(clock.now()))
            .unwrap();

        cache.clear();

        assert_eq!(store.get_item("platewise.auth_snapshot").unwrap(), None);
    }

    #[test]
    fn corrupt_payload_degrades_to_miss_and_is_dropped() {
        let (cache, store, _) = build();
        store
            .set_item("platewise.auth_snapshot", "not json")
            .unwrap();

        assert!(cache.get().is_none());
        assert_eq!(store.get_item("platewise.auth_snapshot").unwrap(), None);
    }
}
