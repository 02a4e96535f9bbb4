use std::fmt;
use std::sync::Arc;

use super::r#trait::StateListener;

/// Shared reference to one registered client.
///
/// Cloning adds a reference and dropping releases it, so a broadcast that
/// captured a handle can finish even if the client is deregistered meanwhile.
#[derive(Clone)]
pub struct ClientHandle {
    callsign: Arc<str>,
    listener: Arc<dyn StateListener>,
}

impl ClientHandle {
    pub fn new(callsign: impl Into<Arc<str>>, listener: Arc<dyn StateListener>) -> Self {
        Self {
            callsign: callsign.into(),
            listener,
        }
    }

    pub fn callsign(&self) -> &str {
        &self.callsign
    }

    pub async fn request(&self, state: &str) -> anyhow::Result<()> {
        self.listener.request(state).await
    }

    /// Both handles point at the same listener object.
    pub fn ptr_eq(&self, other: &ClientHandle) -> bool {
        Arc::ptr_eq(&self.listener, &other.listener)
    }

    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.listener)
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("callsign", &self.callsign)
            .field("refs", &self.ref_count())
            .finish()
    }
}
