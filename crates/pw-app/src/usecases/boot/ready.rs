//! One-shot readiness signal.
//!
//! `boot()` awaits this before resolving anything, so the identity event
//! listener is guaranteed to be subscribed first. Replaces the original
//! busy-waited "is listener ready" flag with a resolved-once future.

use tokio::sync::watch;

pub struct ReadySignal {
    tx: watch::Sender<bool>,
}

impl ReadySignal {
    /// A signal that has not fired yet.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// An already-fired signal, for wirings without an event listener.
    pub fn fired() -> Self {
        let (tx, _rx) = watch::channel(true);
        Self { tx }
    }

    /// Fire the signal. Idempotent.
    pub fn mark_ready(&self) {
        self.tx.send_replace(true);
    }

    /// Resolve once the signal has fired; immediately if it already has.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as self, so wait_for cannot fail here.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn fired_signal_resolves_immediately() {
        ReadySignal::fired().wait().await;
    }

    #[tokio::test]
    async fn wait_blocks_until_marked_ready() {
        let signal = Arc::new(ReadySignal::new());

        let waiter = {
            let signal = Arc::clone(&signal);
            tokio::spawn(async move { signal.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        signal.mark_ready();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn mark_ready_is_idempotent() {
        let signal = ReadySignal::new();
        signal.mark_ready();
        signal.mark_ready();
        signal.wait().await;
    }
}
