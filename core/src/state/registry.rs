use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::catalog::SystemMode;
use crate::listener::ClientHandle;

type Buckets = HashMap<SystemMode, HashMap<String, ClientHandle>>;

/// Registered clients per mode, behind a single lock.
///
/// The lock only guards membership. Nothing here calls into a client: the
/// methods hand handles back so the caller can invoke or drop them after the
/// guard is gone.
#[derive(Default)]
pub struct ClientRegistry {
    buckets: Mutex<Buckets>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Buckets> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts `handle` under its callsign, returning the handle it replaced.
    pub fn register(&self, mode: SystemMode, handle: ClientHandle) -> Option<ClientHandle> {
        let callsign = handle.callsign().to_string();
        self.lock().entry(mode).or_default().insert(callsign, handle)
    }

    pub fn unregister(&self, mode: SystemMode, callsign: &str) -> Option<ClientHandle> {
        let mut buckets = self.lock();
        let bucket = buckets.get_mut(&mode)?;
        let removed = bucket.remove(callsign);
        if bucket.is_empty() {
            buckets.remove(&mode);
        }
        removed
    }

    /// Takes an extra reference on every handle registered for `mode`.
    ///
    /// This is the only way a broadcast obtains handles. The references are
    /// released when the snapshot is dropped.
    pub fn snapshot_for_notify(&self, mode: SystemMode) -> NotifySnapshot {
        let handles = self
            .lock()
            .get(&mode)
            .map(|bucket| bucket.values().cloned().collect())
            .unwrap_or_default();
        NotifySnapshot { mode, handles }
    }

    /// Empties the registry and returns the drained handles.
    pub fn clear(&self) -> Vec<ClientHandle> {
        self.lock()
            .drain()
            .flat_map(|(_, bucket)| bucket.into_values())
            .collect()
    }

    pub fn get(&self, mode: SystemMode, callsign: &str) -> Option<ClientHandle> {
        self.lock().get(&mode)?.get(callsign).cloned()
    }

    pub fn contains(&self, mode: SystemMode, callsign: &str) -> bool {
        self.lock()
            .get(&mode)
            .is_some_and(|bucket| bucket.contains_key(callsign))
    }

    /// Registered callsigns for `mode`, sorted.
    pub fn callsigns(&self, mode: SystemMode) -> Vec<String> {
        let mut out: Vec<String> = self
            .lock()
            .get(&mode)
            .map(|bucket| bucket.keys().cloned().collect())
            .unwrap_or_default();
        out.sort();
        out
    }

    pub fn len(&self, mode: SystemMode) -> usize {
        self.lock().get(&mode).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().values().all(HashMap::is_empty)
    }
}

/// Handles captured for one broadcast. Owns one reference per handle.
#[derive(Debug)]
pub struct NotifySnapshot {
    mode: SystemMode,
    handles: Vec<ClientHandle>,
}

impl NotifySnapshot {
    pub fn mode(&self) -> SystemMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientHandle> {
        self.handles.iter()
    }

    pub fn release(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::testing::RecordingListener;
    use std::sync::Arc;

    const MODE: SystemMode = SystemMode::DeviceOptimize;

    fn handle(callsign: &str) -> ClientHandle {
        ClientHandle::new(callsign, RecordingListener::new())
    }

    #[test]
    fn test_register_replaces_existing_entry() {
        let registry = ClientRegistry::new();
        let first = handle("A");
        let second = handle("A");

        assert!(registry.register(MODE, first.clone()).is_none());
        let replaced = registry.register(MODE, second.clone()).unwrap();
        assert!(replaced.ptr_eq(&first));
        assert_eq!(registry.len(MODE), 1);
        assert!(registry.get(MODE, "A").unwrap().ptr_eq(&second));

        drop(replaced);
        // test-local clone only
        assert_eq!(first.ref_count(), 1);
    }

    #[test]
    fn test_unregister_unknown_is_none() {
        let registry = ClientRegistry::new();
        assert!(registry.unregister(MODE, "missing").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_holds_its_own_reference() {
        let registry = ClientRegistry::new();
        let listener = RecordingListener::new();
        registry.register(MODE, ClientHandle::new("A", listener.clone()));

        let snapshot = registry.snapshot_for_notify(MODE);
        assert_eq!(snapshot.len(), 1);

        let removed = registry.unregister(MODE, "A").unwrap();
        drop(removed);
        // the snapshot keeps the listener alive after deregistration
        assert_eq!(Arc::strong_count(&listener), 2);

        snapshot.release();
        assert_eq!(Arc::strong_count(&listener), 1);
    }

    #[test]
    fn test_clear_drains_everything() {
        let registry = ClientRegistry::new();
        registry.register(MODE, handle("A"));
        registry.register(MODE, handle("B"));
        assert_eq!(registry.callsigns(MODE), vec!["A".to_string(), "B".to_string()]);

        let drained = registry.clear();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
        assert!(registry.snapshot_for_notify(MODE).is_empty());
    }
}
