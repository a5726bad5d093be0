//! Profile resolution and lazy creation.
//!
//! Fetches the profile for a resolved identity under a short deadline. A
//! "not found" answer synthesizes and persists a minimal profile. Permission
//! and creation failures degrade to "no profile" (the shell routes to
//! onboarding); only a fetch that times out across the whole retry budget is
//! terminal.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use pw_core::error::{BootFailure, ProfileStoreError, Retryable};
use pw_core::ports::ProfileStorePort;
use pw_core::{Identity, Profile, ProfileOutcome};

use crate::retry::{with_deadline, with_retry, RetryPolicy};
use crate::usecases::boot::FetchError;

const FETCH_DEADLINE: Duration = Duration::from_millis(700);
const CREATE_DEADLINE: Duration = Duration::from_millis(1000);

/// What the profile-resolution phase produced.
///
/// `failure` is only set for terminal conditions; degraded outcomes leave it
/// empty and the route decision falls back to onboarding.
#[derive(Debug, Clone)]
pub struct ProfileResolution {
    pub profile: Option<Profile>,
    pub outcome: ProfileOutcome,
    /// Total fetch invocations, including the first.
    pub attempts: u32,
    pub failure: Option<BootFailure>,
}

/// Use case resolving or lazily creating the profile for an identity.
pub struct ResolveProfile {
    profiles: Arc<dyn ProfileStorePort>,
    policy: RetryPolicy,
}

impl ResolveProfile {
    pub fn new(profiles: Arc<dyn ProfileStorePort>) -> Self {
        Self {
            profiles,
            policy: RetryPolicy::new(2, Duration::from_millis(150), Duration::from_secs(1)),
        }
    }

    pub fn with_policy(profiles: Arc<dyn ProfileStorePort>, policy: RetryPolicy) -> Self {
        Self { profiles, policy }
    }

    pub async fn execute(&self, identity: &Identity) -> ProfileResolution {
        let calls = AtomicU32::new(0);
        let fetched = with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                let profiles = Arc::clone(&self.profiles);
                let user_id = identity.id.clone();
                async move {
                    match with_deadline(
                        profiles.fetch_profile(&user_id),
                        FETCH_DEADLINE,
                        "profile.fetch",
                    )
                    .await
                    {
                        Ok(Ok(profile)) => Ok(profile),
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
            Ok(profile) => ProfileResolution {
                profile: Some(profile),
                outcome: ProfileOutcome::Ok,
                attempts,
                failure: None,
            },
            Err(retry_err) => match retry_err.source {
                FetchError::Upstream(ProfileStoreError::NotFound) => {
                    self.create_profile(identity, attempts).await
                }
                FetchError::Timeout(_) => {
                    warn!(attempts = retry_err.attempts, user_id = %identity.id, "profile fetch timed out across retries");
                    ProfileResolution {
                        profile: None,
                        outcome: ProfileOutcome::Timeout,
                        attempts,
                        failure: Some(BootFailure::RetriesExhausted {
                            attempts: retry_err.attempts,
                            message: retry_err.source.to_string(),
                        }),
                    }
                }
                FetchError::Upstream(err) => {
                    warn!(error = %err, user_id = %identity.id, "profile fetch failed, degrading to no profile");
                    ProfileResolution {
                        profile: None,
                        outcome: ProfileOutcome::Error,
                        attempts,
                        failure: None,
                    }
                }
            },
        }
    }

    async fn create_profile(&self, identity: &Identity, attempts: u32) -> ProfileResolution {
        let new_profile = Profile::bootstrap_for(identity);
        match with_deadline(
            self.profiles.create_profile(new_profile),
            CREATE_DEADLINE,
            "profile.create",
        )
        .await
        {
            Ok(Ok(profile)) => {
                info!(user_id = %identity.id, "created profile on first sign-in");
                ProfileResolution {
                    profile: Some(profile),
                    outcome: ProfileOutcome::Created,
                    attempts,
                    failure: None,
                }
            }
            Ok(Err(err)) => {
                warn!(error = %err, user_id = %identity.id, "profile creation failed, degrading to no profile");
                ProfileResolution {
                    profile: None,
                    outcome: ProfileOutcome::Error,
                    attempts,
                    failure: None,
                }
            }
            Err(timeout) => {
                warn!(error = %timeout, user_id = %identity.id, "profile creation timed out, degrading to no profile");
                ProfileResolution {
                    profile: None,
                    outcome: ProfileOutcome::Timeout,
                    attempts,
                    failure: None,
                }
            }
        }
    }
}
