//! Identity event listener.
//!
//! Subscribes to the identity provider's event stream and keeps the boot
//! sequencer in sync: sign-out clears the snapshot cache and forces the
//! signed-out route without any network round trip; sign-in and token
//! refresh restart the bootstrap cycle unless one is already in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use pw_core::identity::AuthEvent;
use pw_core::ports::{AuthCachePort, IdentityPort};

use crate::usecases::boot::sequencer::BootSequencer;

pub struct IdentityEventListener {
    identity: Arc<dyn IdentityPort>,
    cache: Arc<dyn AuthCachePort>,
    sequencer: BootSequencer,
    started: AtomicBool,
}

impl IdentityEventListener {
    pub fn new(
        identity: Arc<dyn IdentityPort>,
        cache: Arc<dyn AuthCachePort>,
        sequencer: BootSequencer,
    ) -> Self {
        Self {
            identity,
            cache,
            sequencer,
            started: AtomicBool::new(false),
        }
    }

    /// Subscribe to provider events and fire the sequencer's readiness
    /// signal. Subsequent calls are no-ops. The returned handle drives the
    /// event loop until the provider closes the stream.
    pub async fn start(&self) -> anyhow::Result<Option<JoinHandle<()>>> {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("identity event listener already started");
            return Ok(None);
        }

        let mut events = self.identity.subscribe_events().await?;
        self.sequencer.mark_listener_ready();
        info!("identity event listener subscribed");

        let cache = Arc::clone(&self.cache);
        let sequencer = self.sequencer.clone();
        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                handle_event(event, &cache, &sequencer).await;
            }
            warn!("identity event stream closed");
        });
        Ok(Some(handle))
    }
}

async fn handle_event(
    event: AuthEvent,
    cache: &Arc<dyn AuthCachePort>,
    sequencer: &BootSequencer,
) {
    match event {
        AuthEvent::SignedOut => {
            info!("sign-out event, clearing cached snapshot");
            cache.clear();
            sequencer.force_signed_out();
        }
        AuthEvent::SignedIn(_) | AuthEvent::TokenRefreshed(_) => {
            if sequencer.is_booting().await {
                debug!(?event, "bootstrap already in flight, ignoring event");
            } else {
                info!(?event, "identity event, restarting bootstrap");
                sequencer.retry().await;
            }
        }
        AuthEvent::InitialSession(_) => {
            // The initial-session echo arrives right after subscribing,
            // while the first boot() is usually pending. Only act on it if
            // nothing is in flight.
            if !sequencer.is_booting().await {
                sequencer.boot().await;
            }
        }
    }
}
