//! Bootstrap use cases.
//!
//! `ResolveSession` and `ResolveProfile` wrap the external ports with the
//! deadline/retry primitives; `BootSequencer` orchestrates one bootstrap
//! attempt end to end; `IdentityEventListener` restarts the cycle on
//! provider events.

mod listener;
mod ready;
mod resolve_profile;
mod resolve_session;
mod sequencer;

pub use listener::IdentityEventListener;
pub use ready::ReadySignal;
pub use resolve_profile::{ProfileResolution, ResolveProfile};
pub use resolve_session::{ResolveSession, SessionResolution};
pub use sequencer::{BootSequencer, BootSequencerDeps, StateSubscription};

use pw_core::error::{Retryable, TimeoutError};

/// A port call that either timed out or failed upstream.
#[derive(Debug, thiserror::Error)]
pub(crate) enum FetchError<E>
where
    E: std::error::Error + 'static,
{
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error(transparent)]
    Upstream(E),
}

impl<E> Retryable for FetchError<E>
where
    E: std::error::Error + Retryable + 'static,
{
    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Upstream(err) => err.is_retryable(),
        }
    }
}
