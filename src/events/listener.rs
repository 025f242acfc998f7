use async_trait::async_trait;

use crate::events::AuthEvent;

/// Receives every dispatched [`AuthEvent`].
///
/// Listeners run inline on the dispatching task, so handlers should stay
/// short and must not panic.
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    async fn handle(&self, event: &AuthEvent);
}
