//! Cached auth snapshot.
//!
//! A time-boxed, persisted copy of the last fully successful bootstrap.
//! A snapshot older than the TTL or whose embedded session has expired
//! must be treated as absent.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{Identity, Session};
use crate::profile::Profile;

/// Wall-clock TTL since capture, in seconds.
pub const SNAPSHOT_TTL_SECS: i64 = 5 * 60;

/// Persisted snapshot of a resolved identity + profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAuthSnapshot {
    pub identity: Identity,
    pub profile: Profile,
    pub access_token: String,
    pub session_expiry: DateTime<Utc>,
    pub captured_at: DateTime<Utc>,
    /// Cleared by `invalidate()` without deleting the entry.
    pub valid: bool,
}

impl CachedAuthSnapshot {
    pub fn capture(
        identity: Identity,
        profile: Profile,
        session: &Session,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            identity,
            profile,
            access_token: session.access_token.clone(),
            session_expiry: session.expires_at,
            captured_at: now,
            valid: true,
        }
    }

    /// Both freshness checks are independent: TTL since capture and the
    /// embedded session's own expiry.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.valid
            && now - self.captured_at < Duration::seconds(SNAPSHOT_TTL_SECS)
            && self.session_expiry > now
    }

    /// Rebuild the session this snapshot was captured from.
    pub fn session(&self) -> Session {
        Session {
            identity: self.identity.clone(),
            access_token: self.access_token.clone(),
            expires_at: self.session_expiry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UserId;

    fn snapshot(now: DateTime<Utc>) -> CachedAuthSnapshot {
        let identity = Identity {
            id: UserId::new("u1"),
            email: "u1@example.com".into(),
            email_verified: true,
        };
        let profile = Profile {
            user_id: identity.id.clone(),
            display_name: "u1".into(),
            onboarding_complete: true,
            fields: Default::default(),
        };
        let session = Session {
            identity: identity.clone(),
            access_token: "tok".into(),
            expires_at: now + Duration::hours(1),
        };
        CachedAuthSnapshot::capture(identity, profile, &session, now)
    }

    #[test]
    fn fresh_snapshot_is_usable() {
        let now = Utc::now();
        assert!(snapshot(now).is_usable(now + Duration::seconds(30)));
    }

    #[test]
    fn snapshot_older_than_ttl_is_not_usable() {
        let now = Utc::now();
        let snap = snapshot(now);
        assert!(!snap.is_usable(now + Duration::seconds(SNAPSHOT_TTL_SECS)));
    }

    #[test]
    fn snapshot_with_expired_session_is_not_usable_regardless_of_capture_time() {
        let now = Utc::now();
        let mut snap = snapshot(now);
        snap.session_expiry = now + Duration::seconds(10);
        assert!(!snap.is_usable(now + Duration::seconds(10)));
    }

    #[test]
    fn invalidated_snapshot_is_not_usable() {
        let now = Utc::now();
        let mut snap = snapshot(now);
        snap.valid = false;
        assert!(!snap.is_usable(now));
    }

    #[test]
    fn session_round_trips_token_and_expiry() {
        let now = Utc::now();
        let snap = snapshot(now);
        let session = snap.session();
        assert_eq!(session.access_token, "tok");
        assert_eq!(session.expires_at, snap.session_expiry);
    }
}
