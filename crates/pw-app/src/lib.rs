//! # pw-app
//!
//! Use cases and orchestration for the Platewise session bootstrap: the
//! deadline/retry primitives, session and profile resolution, the boot
//! sequencer state machine, and the identity event listener.

pub mod retry;
pub mod usecases;

pub use retry::{with_deadline, with_retry, RetryPolicy};
pub use usecases::boot::{
    BootSequencer, BootSequencerDeps, IdentityEventListener, ProfileResolution, ReadySignal,
    ResolveProfile, ResolveSession, SessionResolution, StateSubscription,
};
