//! Identity domain models.
//!
//! Read-only copies of what the identity provider resolved: who the user is
//! and the time-bounded session proving it. The provider's raw payloads are
//! validated at the boundary ([`RawSession`]) before they enter the state
//! machine.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// Opaque user identifier issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The authenticated user record owned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
    pub email_verified: bool,
}

/// A time-bounded proof of authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub identity: Identity,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Raw session payload as the identity provider ships it, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSession {
    pub user_id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub access_token: String,
    /// Unix timestamp in seconds.
    pub expires_at: i64,
}

impl TryFrom<RawSession> for Session {
    type Error = IdentityError;

    fn try_from(raw: RawSession) -> Result<Self, Self::Error> {
        if raw.user_id.is_empty() {
            return Err(IdentityError::Corrupt("empty user id".into()));
        }
        if raw.access_token.is_empty() {
            return Err(IdentityError::Corrupt("empty access token".into()));
        }
        let expires_at = Utc
            .timestamp_opt(raw.expires_at, 0)
            .single()
            .ok_or_else(|| {
                IdentityError::Corrupt(format!("invalid expiry timestamp {}", raw.expires_at))
            })?;

        Ok(Session {
            identity: Identity {
                id: UserId::new(raw.user_id),
                email: raw.email.unwrap_or_default(),
                email_verified: raw.email_verified,
            },
            access_token: raw.access_token,
            expires_at,
        })
    }
}

/// Asynchronous identity-provider notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// The user completed a sign-in.
    SignedIn(Session),
    /// The user signed out; all cached auth state is stale.
    SignedOut,
    /// The provider refreshed the session token.
    TokenRefreshed(Session),
    /// The provider's own cold-start notification of the persisted session.
    InitialSession(Option<Session>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn raw() -> RawSession {
        RawSession {
            user_id: "user-1".into(),
            email: Some("alex@example.com".into()),
            email_verified: true,
            access_token: "tok".into(),
            expires_at: 1_700_000_000,
        }
    }

    #[test]
    fn valid_raw_session_converts() {
        let session = Session::try_from(raw()).unwrap();
        assert_eq!(session.identity.id.as_str(), "user-1");
        assert_eq!(session.identity.email, "alex@example.com");
        assert!(session.identity.email_verified);
    }

    #[test]
    fn empty_user_id_is_corrupt() {
        let mut bad = raw();
        bad.user_id = String::new();
        assert!(matches!(
            Session::try_from(bad),
            Err(IdentityError::Corrupt(_))
        ));
    }

    #[test]
    fn empty_token_is_corrupt() {
        let mut bad = raw();
        bad.access_token = String::new();
        assert!(matches!(
            Session::try_from(bad),
            Err(IdentityError::Corrupt(_))
        ));
    }

    #[test]
    fn expiry_comparison_is_inclusive() {
        let session = Session::try_from(raw()).unwrap();
        assert!(session.is_expired(session.expires_at));
        assert!(session.is_expired(session.expires_at + Duration::seconds(1)));
        assert!(!session.is_expired(session.expires_at - Duration::seconds(1)));
    }
}
