//! Session resolution.
//!
//! Wraps the identity provider's "get current session" capability in a
//! retry loop around a per-attempt deadline. A first successful-but-empty
//! answer gets one secondary, shorter-deadline attempt to tolerate slow
//! session restoration from persisted storage on cold start.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use pw_core::error::{BootFailure, IdentityError, Retryable};
use pw_core::ports::IdentityPort;
use pw_core::{Session, SessionOutcome};

use crate::retry::{with_deadline, with_retry, RetryPolicy};
use crate::usecases::boot::FetchError;

const PRIMARY_DEADLINE: Duration = Duration::from_secs(3);
const FALLBACK_DEADLINE: Duration = Duration::from_secs(2);

/// What the session-resolution phase produced.
#[derive(Debug, Clone)]
pub struct SessionResolution {
    pub session: Option<Session>,
    pub outcome: SessionOutcome,
    /// Total primary-fetch invocations, including the first.
    pub attempts: u32,
    pub failure: Option<BootFailure>,
}

/// Use case resolving the current session under deadline and retry budgets.
pub struct ResolveSession {
    identity: Arc<dyn IdentityPort>,
    policy: RetryPolicy,
}

impl ResolveSession {
    pub fn new(identity: Arc<dyn IdentityPort>) -> Self {
        Self {
            identity,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(identity: Arc<dyn IdentityPort>, policy: RetryPolicy) -> Self {
        Self { identity, policy }
    }

    pub async fn execute(&self) -> SessionResolution {
        let calls = AtomicU32::new(0);
        let fetched = with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                let identity = Arc::clone(&self.identity);
                async move {
                    match with_deadline(
                        identity.current_session(),
                        PRIMARY_DEADLINE,
                        "session.fetch",
                    )
                    .await
                    {
                        Ok(Ok(session)) => Ok(session),
                        Ok(Err(err)) => Err(FetchError::Upstream(err)),
                        Err(timeout) => Err(FetchError::Timeout(timeout)),
                    }
                }
            },
            &self.policy,
            FetchError::is_retryable,
        )
        .await;
        let attempts = calls.load(Ordering::SeqCst);

        match fetched {
            Ok(Some(session)) => SessionResolution {
                session: Some(session),
                outcome: SessionOutcome::Ok,
                attempts,
                failure: None,
            },
            Ok(None) => self.fallback_fetch(attempts).await,
            Err(retry_err) => {
                let (outcome, failure) = classify_exhausted(&retry_err.source, retry_err.attempts);
                warn!(attempts = retry_err.attempts, error = %retry_err.source, "session resolution exhausted");
                SessionResolution {
                    session: None,
                    outcome,
                    attempts,
                    failure: Some(failure),
                }
            }
        }
    }

    /// Secondary attempt after an empty primary answer. Failure here is not
    /// an error: the primary already told us nothing is signed in.
    async fn fallback_fetch(&self, attempts: u32) -> SessionResolution {
        let session = match with_deadline(
            self.identity.current_session(),
            FALLBACK_DEADLINE,
            "session.fetch.fallback",
        )
        .await
        {
            Ok(Ok(session)) => session,
            Ok(Err(err)) => {
                debug!(error = %err, "fallback session fetch failed, treating as absent");
                None
            }
            Err(timeout) => {
                debug!(error = %timeout, "fallback session fetch timed out, treating as absent");
                None
            }
        };

        let outcome = if session.is_some() {
            SessionOutcome::Ok
        } else {
            SessionOutcome::None
        };
        SessionResolution {
            session,
            outcome,
            attempts,
            failure: None,
        }
    }
}

fn classify_exhausted(
    source: &FetchError<IdentityError>,
    attempts: u32,
) -> (SessionOutcome, BootFailure) {
    match source {
        FetchError::Timeout(_) => (
            SessionOutcome::Timeout,
            BootFailure::RetriesExhausted {
                attempts,
                message: source.to_string(),
            },
        ),
        FetchError::Upstream(IdentityError::PermissionDenied) => {
            (SessionOutcome::Error, BootFailure::Permission)
        }
        FetchError::Upstream(IdentityError::Unavailable(_)) => (
            SessionOutcome::Error,
            BootFailure::RetriesExhausted {
                attempts,
                message: source.to_string(),
            },
        ),
        FetchError::Upstream(err) => (SessionOutcome::Error, BootFailure::Unknown(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use pw_core::identity::{AuthEvent, Identity, UserId};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    enum Reply {
        Session,
        Absent,
        Fail(IdentityError),
        Hang,
    }

    struct ScriptedIdentity {
        replies: Mutex<VecDeque<Reply>>,
    }

    impl ScriptedIdentity {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
            })
        }
    }

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

    #[async_trait]
    impl IdentityPort for ScriptedIdentity {
        async fn current_session(&self) -> Result<Option<Session>, IdentityError> {
            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(Reply::Session) => Ok(Some(session())),
                Some(Reply::Absent) | None => Ok(None),
                Some(Reply::Fail(err)) => Err(err),
                Some(Reply::Hang) => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }

        async fn subscribe_events(&self) -> anyhow::Result<mpsc::Receiver<AuthEvent>> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_answer_with_session_resolves_ok() {
        let resolve = ResolveSession::new(ScriptedIdentity::new(vec![Reply::Session]));
        let resolution = resolve.execute().await;
        assert_eq!(resolution.outcome, SessionOutcome::Ok);
        assert_eq!(resolution.attempts, 1);
        assert!(resolution.session.is_some());
        assert!(resolution.failure.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_unavailability_is_retried() {
        let resolve = ResolveSession::new(ScriptedIdentity::new(vec![
            Reply::Fail(IdentityError::Unavailable("dns".into())),
            Reply::Session,
        ]));
        let resolution = resolve.execute().await;
        assert_eq!(resolution.outcome, SessionOutcome::Ok);
        assert_eq!(resolution.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_primary_answer_gets_one_fallback_attempt() {
        let resolve =
            ResolveSession::new(ScriptedIdentity::new(vec![Reply::Absent, Reply::Session]));
        let resolution = resolve.execute().await;
        assert_eq!(resolution.outcome, SessionOutcome::Ok);
        assert!(resolution.session.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_primary_and_fallback_resolves_absent() {
        let resolve =
            ResolveSession::new(ScriptedIdentity::new(vec![Reply::Absent, Reply::Absent]));
        let resolution = resolve.execute().await;
        assert_eq!(resolution.outcome, SessionOutcome::None);
        assert!(resolution.session.is_none());
        assert!(resolution.failure.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn permission_denied_is_never_retried() {
        let resolve = ResolveSession::new(ScriptedIdentity::new(vec![Reply::Fail(
            IdentityError::PermissionDenied,
        )]));
        let resolution = resolve.execute().await;
        assert_eq!(resolution.outcome, SessionOutcome::Error);
        assert_eq!(resolution.attempts, 1);
        assert_eq!(resolution.failure, Some(BootFailure::Permission));
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_timeouts_exhaust_the_budget() {
        let resolve = ResolveSession::with_policy(
            ScriptedIdentity::new(vec![Reply::Hang, Reply::Hang, Reply::Hang, Reply::Hang]),
            RetryPolicy::default(),
        );
        let resolution = resolve.execute().await;
        assert_eq!(resolution.outcome, SessionOutcome::Timeout);
        assert_eq!(resolution.attempts, 4);
        assert!(matches!(
            resolution.failure,
            Some(BootFailure::RetriesExhausted { attempts: 4, .. })
        ));
    }
}
