//! Boot state machine domain models.
//!
//! Defines the states one bootstrap attempt moves through, the terminal
//! [`BootResult`] the shell consumes, and the pure route decision.

mod snapshot;

pub use snapshot::{CachedAuthSnapshot, SNAPSHOT_TTL_SECS};

use serde::{Deserialize, Serialize};

use crate::error::BootFailure;
use crate::identity::Session;
use crate::profile::Profile;

/// State of the boot sequencer.
///
/// Exactly one state is current at any instant. `Ready` is terminal for one
/// attempt but not for the sequencer's lifetime; a later identity event may
/// restart the cycle from `Boot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootState {
    Boot,
    ResolvingSession,
    SessionAbsent,
    SessionPresent,
    ProfileCheck,
    OnboardingRequired,
    RouteDashboard,
    BootError,
    Ready,
}

/// Top-level route the shell should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppRoute {
    /// Sign-in / sign-up screen.
    Auth,
    /// First-run onboarding flow.
    Onboarding,
    /// The main application.
    Dashboard,
    /// Retry-capable error screen.
    BootError,
}

/// Outcome of the session-resolution phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionOutcome {
    None,
    Ok,
    Timeout,
    Error,
}

/// Outcome of the profile-resolution phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileOutcome {
    Ok,
    Created,
    Timeout,
    Error,
    /// Phase never ran (no session, cache hit, or earlier failure).
    Skipped,
}

/// Per-attempt metrics attached to every [`BootResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootMetrics {
    pub elapsed_ms: u64,
    pub session_outcome: SessionOutcome,
    pub profile_outcome: ProfileOutcome,
    pub retries: u32,
    pub cache_hit: bool,
}

/// Terminal output of one bootstrap attempt. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BootResult {
    pub route: AppRoute,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub error: Option<BootFailure>,
    pub metrics: BootMetrics,
}

/// Pure route decision from resolved session and profile.
///
/// A terminal failure routes to [`AppRoute::BootError`] before this is
/// consulted; degraded outcomes (missing or failed profile with a live
/// session) land on onboarding.
pub fn decide_route(session: Option<&Session>, profile: Option<&Profile>) -> AppRoute {
    match session {
        None => AppRoute::Auth,
        Some(_) => match profile {
            Some(profile) if profile.onboarding_complete => AppRoute::Dashboard,
            _ => AppRoute::Onboarding,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Identity, UserId};
    use chrono::Utc;

    fn session() -> Session {
        Session {
            identity: Identity {
                id: UserId::new("u1"),
                email: "u1@example.com".into(),
                email_verified: true,
            },
            access_token: "tok".into(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    fn profile(onboarding_complete: bool) -> Profile {
        Profile {
            user_id: UserId::new("u1"),
            display_name: "u1".into(),
            onboarding_complete,
            fields: Default::default(),
        }
    }

    #[test]
    fn no_session_routes_to_auth() {
        assert_eq!(decide_route(None, None), AppRoute::Auth);
        assert_eq!(decide_route(None, Some(&profile(true))), AppRoute::Auth);
    }

    #[test]
    fn session_without_profile_routes_to_onboarding() {
        assert_eq!(decide_route(Some(&session()), None), AppRoute::Onboarding);
    }

    #[test]
    fn incomplete_onboarding_routes_to_onboarding() {
        assert_eq!(
            decide_route(Some(&session()), Some(&profile(false))),
            AppRoute::Onboarding
        );
    }

    #[test]
    fn completed_onboarding_routes_to_dashboard() {
        assert_eq!(
            decide_route(Some(&session()), Some(&profile(true))),
            AppRoute::Dashboard
        );
    }
}
