//! Deadline and retry primitives.
//!
//! Two independent, composable wrappers around arbitrary async operations.
//! Neither knows anything about identity or profile types; the boot
//! resolvers compose them with their own deadlines and predicates.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use pw_core::error::{RetryError, TimeoutError};

/// Race `fut` against a timer.
///
/// If the timer fires first the result is a [`TimeoutError`] carrying the
/// label and the budget; the loser branch is dropped, not cancelled — the
/// underlying I/O may still complete, and by construction its late result
/// touches nothing.
pub async fn with_deadline<F, T>(fut: F, timeout: Duration, label: &str) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(value) => Ok(value),
        Err(_) => Err(TimeoutError::new(label, timeout)),
    }
}

/// Bounded exponential backoff with jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total invocations, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// `min(base * 2^(attempt-1) + jitter, max_delay)` for the completed
    /// attempt number (1-based).
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let shift = attempt.saturating_sub(1).min(16);
        let exp_ms = base_ms.saturating_mul(1u64 << shift);
        let jitter_ms = if base_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=base_ms)
        };
        Duration::from_millis(
            exp_ms
                .saturating_add(jitter_ms)
                .min(self.max_delay.as_millis() as u64),
        )
    }
}

/// Invoke `op` until it succeeds, `should_retry` declines, or the attempt
/// budget is exhausted.
///
/// On final failure the chain is wrapped in a [`RetryError`] reporting how
/// many times the operation actually ran.
pub async fn with_retry<T, E, F, Fut, P>(
    mut op: F,
    policy: &RetryPolicy,
    mut should_retry: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + 'static,
    P: FnMut(&E) -> bool,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_attempts.max(1) || !should_retry(&err) {
                    return Err(RetryError {
                        attempts: attempt,
                        source: err,
                    });
                }
                let delay = policy.backoff_delay(attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying after backoff");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
