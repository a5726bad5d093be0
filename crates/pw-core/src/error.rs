//! Error taxonomy for the bootstrap subsystem.
//!
//! Timeouts and provider-unavailable conditions are retryable; permission,
//! credential and corrupt-payload conditions are not and must never be
//! retried.

use std::time::Duration;

use thiserror::Error;

/// An awaited operation exceeded its deadline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{label} exceeded its {timeout:?} deadline")]
pub struct TimeoutError {
    /// Label identifying the raced operation.
    pub label: String,
    /// The deadline that fired.
    pub timeout: Duration,
}

impl TimeoutError {
    pub fn new(label: impl Into<String>, timeout: Duration) -> Self {
        Self {
            label: label.into(),
            timeout,
        }
    }
}

/// All retry attempts exhausted; wraps the last underlying error.
#[derive(Debug, Error)]
#[error("operation failed after {attempts} attempt(s)")]
pub struct RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// How many times the operation was invoked.
    pub attempts: u32,
    /// The error returned by the final attempt.
    #[source]
    pub source: E,
}

/// Errors reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("identity provider denied the request")]
    PermissionDenied,

    #[error("identity payload corrupt: {0}")]
    Corrupt(String),
}

/// Errors reported by the profile store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileStoreError {
    #[error("profile not found")]
    NotFound,

    #[error("profile access denied")]
    PermissionDenied,

    #[error("profile store unavailable: {0}")]
    Unavailable(String),
}

/// Classifies whether an error is worth another attempt.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for IdentityError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl Retryable for ProfileStoreError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Terminal failure carried on a [`crate::BootResult`].
///
/// The sequencer never throws these out of `boot()`; they are flagged on the
/// result so the shell can render a retry-capable error screen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootFailure {
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error("retries exhausted after {attempts} attempt(s): {message}")]
    RetriesExhausted { attempts: u32, message: String },

    #[error("permission denied by provider")]
    Permission,

    #[error("unexpected boot failure: {0}")]
    Unknown(String),
}
