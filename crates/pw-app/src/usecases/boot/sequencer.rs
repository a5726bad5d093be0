//! Boot sequencer.
//!
//! Orchestrates one bootstrap attempt: cache check, session resolution,
//! profile resolution, route decision, snapshot write and telemetry. At most
//! one bootstrap is in flight at a time; concurrent `boot()` callers share
//! the same pending result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, info_span, warn, Instrument};

use pw_core::ports::{AuthCachePort, IdentityPort, ProfileStorePort};
use pw_core::{
    decide_route, AppRoute, BootMetrics, BootResult, BootState, ProfileOutcome, SessionOutcome,
};

use crate::usecases::boot::ready::ReadySignal;
use crate::usecases::boot::resolve_profile::ResolveProfile;
use crate::usecases::boot::resolve_session::ResolveSession;

type SharedBoot = Shared<BoxFuture<'static, BootResult>>;
type Observer = Box<dyn Fn(BootState) + Send + Sync>;

/// Ports the sequencer is wired with. Constructed explicitly so tests can
/// instantiate fresh sequencers instead of sharing hidden global state.
pub struct BootSequencerDeps {
    pub identity: Arc<dyn IdentityPort>,
    pub profiles: Arc<dyn ProfileStorePort>,
    pub cache: Arc<dyn AuthCachePort>,
    /// Fired by the identity event listener once it is subscribed;
    /// `boot()` waits for it before resolving anything.
    pub ready: Arc<ReadySignal>,
}

struct InflightBoot {
    generation: u64,
    shared: SharedBoot,
}

struct SequencerInner {
    resolve_session: ResolveSession,
    resolve_profile: ResolveProfile,
    cache: Arc<dyn AuthCachePort>,
    ready: Arc<ReadySignal>,

    state: Mutex<BootState>,
    observers: Mutex<Vec<(u64, Observer)>>,
    next_observer_id: AtomicU64,

    inflight: AsyncMutex<Option<InflightBoot>>,
    generation: AtomicU64,
    /// Bumped on every forced sign-out; an in-flight attempt that started
    /// before the bump must not write its snapshot.
    signout_epoch: AtomicU64,
}

/// The bootstrap state machine. Cheap to clone; clones share one machine.
#[derive(Clone)]
pub struct BootSequencer {
    inner: Arc<SequencerInner>,
}

impl BootSequencer {
    pub fn new(deps: BootSequencerDeps) -> Self {
        Self {
            inner: Arc::new(SequencerInner {
                resolve_session: ResolveSession::new(deps.identity),
                resolve_profile: ResolveProfile::new(deps.profiles),
                cache: deps.cache,
                ready: deps.ready,
                state: Mutex::new(BootState::Boot),
                observers: Mutex::new(Vec::new()),
                next_observer_id: AtomicU64::new(0),
                inflight: AsyncMutex::new(None),
                generation: AtomicU64::new(0),
                signout_epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Run (or join) a bootstrap attempt.
    ///
    /// Idempotent while in flight: callers arriving during a pending attempt
    /// receive the same result without duplicate network calls or state
    /// churn. Never returns an error for expected failure categories; those
    /// are flagged on the [`BootResult`].
    pub async fn boot(&self) -> BootResult {
        self.inner.ready.wait().await;
        let shared = self.acquire_inflight(false).await;
        shared.await
    }

    /// Force a fresh bootstrap, bypassing the in-flight guard. Used by the
    /// shell after a `BootError` and by identity events.
    pub async fn retry(&self) -> BootResult {
        self.inner.ready.wait().await;
        let shared = self.acquire_inflight(true).await;
        shared.await
    }

    /// Current state, non-blocking.
    pub fn state(&self) -> BootState {
        *lock_unpoisoned(&self.inner.state)
    }

    /// Register a transition observer. All observers are notified
    /// synchronously, in registration order, on every transition. Dropping
    /// the returned subscription detaches it.
    pub fn subscribe<F>(&self, listener: F) -> StateSubscription
    where
        F: Fn(BootState) + Send + Sync + 'static,
    {
        let id = self.inner.next_observer_id.fetch_add(1, Ordering::SeqCst);
        lock_unpoisoned(&self.inner.observers).push((id, Box::new(listener)));
        StateSubscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether a bootstrap attempt is currently in flight.
    pub async fn is_booting(&self) -> bool {
        self.inner.inflight.lock().await.is_some()
    }

    /// Fire the readiness signal the sequencer was wired with.
    pub fn mark_listener_ready(&self) {
        self.inner.ready.mark_ready();
    }

    /// Transition directly to `SessionAbsent` then `Ready` without any
    /// network round trip. Used when the provider reports a sign-out.
    /// Any attempt still in flight is barred from writing its snapshot.
    pub fn force_signed_out(&self) {
        self.inner.signout_epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.set_state(BootState::SessionAbsent);
        self.inner.set_state(BootState::Ready);
    }

    async fn acquire_inflight(&self, force: bool) -> SharedBoot {
        let mut slot = self.inner.inflight.lock().await;
        if !force {
            if let Some(inflight) = slot.as_ref() {
                return inflight.shared.clone();
            }
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        let shared: SharedBoot = async move {
            let result = inner.run(generation).await;
            // Release the guard unless a forced retry already replaced it.
            let mut slot = inner.inflight.lock().await;
            if slot.as_ref().map(|i| i.generation) == Some(generation) {
                *slot = None;
            }
            result
        }
        .boxed()
        .shared();

        *slot = Some(InflightBoot {
            generation,
            shared: shared.clone(),
        });
        shared
    }
}

impl SequencerInner {
    async fn run(&self, generation: u64) -> BootResult {
        let span = info_span!("boot.sequencer.run", generation);
        async {
            let started = Instant::now();
            let signout_epoch = self.signout_epoch.load(Ordering::SeqCst);
            self.set_state(BootState::Boot);

            if let Some(snapshot) = self.cache.get() {
                let session = snapshot.session();
                let profile = snapshot.profile;
                let route = decide_route(Some(&session), Some(&profile));
                let result = BootResult {
                    route,
                    session: Some(session),
                    profile: Some(profile),
                    error: None,
                    metrics: BootMetrics {
                        elapsed_ms: started.elapsed().as_millis() as u64,
                        session_outcome: SessionOutcome::Ok,
                        profile_outcome: ProfileOutcome::Ok,
                        retries: 0,
                        cache_hit: true,
                    },
                };
                self.set_state(BootState::Ready);
                self.emit_telemetry(&result);
                return result;
            }

            self.set_state(BootState::ResolvingSession);
            let session_res = self.resolve_session.execute().await;
            let mut retries = session_res.attempts.saturating_sub(1);

            let result = match (session_res.outcome, session_res.session) {
                (SessionOutcome::None, _) => {
                    self.set_state(BootState::SessionAbsent);
                    BootResult {
                        route: AppRoute::Auth,
                        session: None,
                        profile: None,
                        error: None,
                        metrics: BootMetrics {
                            elapsed_ms: started.elapsed().as_millis() as u64,
                            session_outcome: SessionOutcome::None,
                            profile_outcome: ProfileOutcome::Skipped,
                            retries,
                            cache_hit: false,
                        },
                    }
                }
                (SessionOutcome::Ok, Some(session)) => {
                    self.set_state(BootState::SessionPresent);
                    self.set_state(BootState::ProfileCheck);
                    let profile_res = self.resolve_profile.execute(&session.identity).await;
                    retries += profile_res.attempts.saturating_sub(1);

                    if let Some(failure) = profile_res.failure {
                        self.set_state(BootState::BootError);
                        BootResult {
                            route: AppRoute::BootError,
                            session: Some(session),
                            profile: None,
                            error: Some(failure),
                            metrics: BootMetrics {
                                elapsed_ms: started.elapsed().as_millis() as u64,
                                session_outcome: SessionOutcome::Ok,
                                profile_outcome: profile_res.outcome,
                                retries,
                                cache_hit: false,
                            },
                        }
                    } else {
                        let route = decide_route(Some(&session), profile_res.profile.as_ref());
                        self.set_state(match route {
                            AppRoute::Dashboard => BootState::RouteDashboard,
                            _ => BootState::OnboardingRequired,
                        });

                        if let Some(profile) = &profile_res.profile {
                            // A sign-out that landed mid-attempt already
                            // cleared the cache; writing now would resurrect
                            // a snapshot for a signed-out user.
                            if self.signout_epoch.load(Ordering::SeqCst) != signout_epoch {
                                info!("sign-out during attempt, skipping snapshot write");
                            } else if let Err(err) =
                                self.cache.set(&session.identity, profile, &session)
                            {
                                warn!(error = %err, "auth snapshot write failed");
                            }
                        }

                        BootResult {
                            route,
                            session: Some(session),
                            profile: profile_res.profile,
                            error: None,
                            metrics: BootMetrics {
                                elapsed_ms: started.elapsed().as_millis() as u64,
                                session_outcome: SessionOutcome::Ok,
                                profile_outcome: profile_res.outcome,
                                retries,
                                cache_hit: false,
                            },
                        }
                    }
                }
                (outcome, _) => {
                    self.set_state(BootState::BootError);
                    BootResult {
                        route: AppRoute::BootError,
                        session: None,
                        profile: None,
                        error: session_res.failure,
                        metrics: BootMetrics {
                            elapsed_ms: started.elapsed().as_millis() as u64,
                            session_outcome: outcome,
                            profile_outcome: ProfileOutcome::Skipped,
                            retries,
                            cache_hit: false,
                        },
                    }
                }
            };

            self.set_state(BootState::Ready);
            self.emit_telemetry(&result);
            result
        }
        .instrument(span)
        .await
    }

    fn set_state(&self, next: BootState) {
        let from = {
            let mut state = lock_unpoisoned(&self.state);
            std::mem::replace(&mut *state, next)
        };
        if from != next {
            info!(?from, to = ?next, "boot state transition");
        }
        let observers = lock_unpoisoned(&self.observers);
        for (_, observer) in observers.iter() {
            observer(next);
        }
    }

    fn emit_telemetry(&self, result: &BootResult) {
        info!(
            route = ?result.route,
            cache_hit = result.metrics.cache_hit,
            session_outcome = ?result.metrics.session_outcome,
            profile_outcome = ?result.metrics.profile_outcome,
            retries = result.metrics.retries,
            elapsed_ms = result.metrics.elapsed_ms,
            error = result.error.as_ref().map(|e| e.to_string()),
            "bootstrap attempt finished"
        );
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a registered state observer. Detaches on drop.
pub struct StateSubscription {
    id: u64,
    inner: Weak<SequencerInner>,
}

impl StateSubscription {
    /// Explicitly detach the observer.
    pub fn detach(self) {}
}

impl Drop for StateSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            lock_unpoisoned(&inner.observers).retain(|(id, _)| *id != self.id);
        }
    }
}
