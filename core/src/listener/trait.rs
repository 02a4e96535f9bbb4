use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::SystemMode;

/// The one capability a registered client exposes: accept a new state,
/// given as the state's persisted encoding (e.g. `GAME`).
#[async_trait]
pub trait StateListener: Send + Sync {
    async fn request(&self, state: &str) -> anyhow::Result<()>;
}

/// Opens a handle to a named client.
///
/// `None` means the client is unknown, not running yet, or does not
/// implement [`StateListener`]; callers treat that as a no-op.
#[async_trait]
pub trait ListenerResolver: Send + Sync {
    fn name(&self) -> &str;

    async fn resolve(&self, callsign: &str, mode: SystemMode) -> Option<Arc<dyn StateListener>>;

    /// Drops whatever connection the resolver holds. Called once on shutdown.
    fn release(&self) {}
}
