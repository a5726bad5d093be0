//! Identity service port.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::IdentityError;
use crate::identity::{AuthEvent, Session};

/// Capability exposed by the identity provider.
///
/// Credential verification, token issuance and the wire protocol are the
/// provider's concern; the bootstrap subsystem only asks "who is signed in
/// right now" and listens for changes.
#[async_trait]
pub trait IdentityPort: Send + Sync {
    /// Resolve the currently signed-in session, if any.
    async fn current_session(&self) -> Result<Option<Session>, IdentityError>;

    /// Subscribe to asynchronous identity events (sign-in, sign-out,
    /// token refresh, cold-start initial session).
    async fn subscribe_events(&self) -> anyhow::Result<mpsc::Receiver<AuthEvent>>;
}
