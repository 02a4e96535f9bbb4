//! Mode state manager

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;

use super::registry::{ClientRegistry, NotifySnapshot};
use super::types::{
    Activation, BroadcastReport, CatchUpPolicy, ListenerFailure, ManagerOptions, ManagerStats,
    ModeStatus,
};
use crate::catalog::{ModeCatalog, ModeDescriptor, State, SystemMode};
use crate::error::ModeError;
use crate::listener::{ClientHandle, ListenerResolver};
use crate::store::{ModeRecords, ModeStore};

/// Tracks the current state of every catalog mode, persists it, and pushes
/// changes to registered clients.
///
/// Cheap to clone; clones share the same registry and store.
#[derive(Clone)]
pub struct StateManager {
    inner: Arc<StateManagerInner>,
}

struct StateManagerInner {
    records: ModeRecords,
    resolver: Arc<dyn ListenerResolver>,
    registry: ClientRegistry,
    /// Modes whose catch-up latch is set.
    requested: Mutex<HashSet<SystemMode>>,
    options: ManagerOptions,
    counters: Counters,
    /// Held across each registry change and the matching persisted
    /// callsign change, and while shutdown drains the registry.
    membership: Mutex<()>,
    shut_down: AtomicBool,
}

#[derive(Default)]
struct Counters {
    requests: AtomicU64,
    notifications: AtomicU64,
    listener_failures: AtomicU64,
    persistence_failures: AtomicU64,
    catch_ups: AtomicU64,
    activations: AtomicU64,
    deactivations: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ManagerStats {
        ManagerStats {
            requests: self.requests.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            catch_ups: self.catch_ups.load(Ordering::Relaxed),
            activations: self.activations.load(Ordering::Relaxed),
            deactivations: self.deactivations.load(Ordering::Relaxed),
        }
    }
}

fn descriptor(mode: SystemMode) -> Result<&'static ModeDescriptor, ModeError> {
    ModeCatalog::descriptor(mode)
        .ok_or_else(|| ModeError::invalid(format!("unknown mode {}", mode.as_raw())))
}

fn mode_by_name(name: &str) -> Result<SystemMode, ModeError> {
    ModeCatalog::mode_from_name(name)
        .ok_or_else(|| ModeError::invalid(format!("unknown mode {name:?}")))
}

impl StateManager {
    /// Builds the manager and seeds the store.
    ///
    /// Every mode without a persisted state gets its default written. Callsigns
    /// left over from a previous run are cleared unless
    /// [`ManagerOptions::restore_clients`] is set.
    pub fn new(
        store: Arc<dyn ModeStore>,
        resolver: Arc<dyn ListenerResolver>,
        options: ManagerOptions,
    ) -> Self {
        let inner = StateManagerInner {
            records: ModeRecords::new(store),
            resolver,
            registry: ClientRegistry::new(),
            requested: Mutex::new(HashSet::new()),
            options,
            counters: Counters::default(),
            membership: Mutex::new(()),
            shut_down: AtomicBool::new(false),
        };
        let manager = Self {
            inner: Arc::new(inner),
        };
        for d in ModeCatalog::descriptors() {
            manager.seed_mode(d);
        }
        tracing::info!(
            target: "sysmode.state",
            stage = "state.init",
            store = %manager.inner.records.store().name(),
            resolver = %manager.inner.resolver.name(),
            catch_up = ?manager.inner.options.catch_up,
            restore_clients = manager.inner.options.restore_clients
        );
        manager
    }

    fn seed_mode(&self, d: &'static ModeDescriptor) {
        let records = &self.inner.records;
        let existing = match records.current_state(d.name) {
            Ok(v) => v,
            Err(e) => {
                self.persistence_failed(d.name, "read currentstate", &e);
                None
            }
        };
        let persisted = existing
            .as_deref()
            .and_then(|name| ModeCatalog::state_from_name(d.mode, name));

        match (existing.as_deref(), persisted) {
            (_, Some(state)) => {
                tracing::debug!(
                    target: "sysmode.state",
                    stage = "state.init.existing",
                    mode = d.name,
                    state = ?state
                );
                if self.inner.options.catch_up == CatchUpPolicy::Persisted {
                    self.set_requested(d.mode);
                }
            }
            (stored, None) => {
                if let Some(stored) = stored {
                    tracing::warn!(
                        target: "sysmode.state",
                        stage = "state.init.unparsable",
                        mode = d.name,
                        stored = %stored,
                        "persisted state is not valid for this mode; resetting to default"
                    );
                }
                if let Some(entry) = d.entry(d.default_state) {
                    if let Err(e) = records.write_current_state(d.name, entry.name) {
                        self.persistence_failed(d.name, "seed currentstate", &e);
                    }
                }
            }
        }

        if self.inner.options.restore_clients {
            return;
        }
        match records.registered_callsigns(d.name) {
            Ok(stale) if !stale.is_empty() => {
                tracing::info!(
                    target: "sysmode.state",
                    stage = "state.init.clear_callsigns",
                    mode = d.name,
                    count = stale.len()
                );
                if let Err(e) = records.clear_callsigns(d.name) {
                    self.persistence_failed(d.name, "clear callsigns", &e);
                }
            }
            Ok(_) => {}
            Err(e) => self.persistence_failed(d.name, "read callsigns", &e),
        }
    }

    fn persistence_failed(&self, section: &str, op: &str, err: &dyn std::error::Error) {
        Counters::bump(&self.inner.counters.persistence_failures);
        tracing::error!(
            target: "sysmode.store",
            stage = "store.failure",
            mode = section,
            op = op,
            error = %err
        );
    }

    fn lock_membership(&self) -> std::sync::MutexGuard<'_, ()> {
        self.inner
            .membership
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_requested(&self, mode: SystemMode) {
        self.inner
            .requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(mode);
    }

    /// Catch-up latch for `mode`.
    pub fn is_requested(&self, mode: SystemMode) -> bool {
        self.inner
            .requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&mode)
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.inner.options
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    /// Changes the state of `mode` and notifies every client registered for it.
    ///
    /// Only an unknown mode or a state the mode does not accept is an error.
    /// Listener failures and a failed write are logged, counted and reported
    /// in the returned [`BroadcastReport`].
    pub async fn request_state(
        &self,
        mode: SystemMode,
        state: State,
    ) -> Result<BroadcastReport, ModeError> {
        let d = descriptor(mode)?;
        let entry = d.entry(state).ok_or_else(|| {
            ModeError::invalid(format!("state {state:?} is not valid for mode {}", d.name))
        })?;
        Counters::bump(&self.inner.counters.requests);

        let old_state = self.inner.records.current_state(d.name).unwrap_or_else(|e| {
            tracing::debug!(target: "sysmode.state", mode = d.name, error = %e, "old state unavailable");
            None
        });

        let snapshot = self.inner.registry.snapshot_for_notify(mode);
        tracing::debug!(
            target: "sysmode.state",
            stage = "state.request.in",
            mode = d.name,
            state = entry.name,
            listeners = snapshot.len()
        );
        let mut report = self.broadcast(&snapshot, entry.name).await;
        snapshot.release();

        match self.inner.records.write_current_state(d.name, entry.name) {
            Ok(()) => report.persisted = true,
            Err(e) => self.persistence_failed(d.name, "write currentstate", &e),
        }
        self.set_requested(mode);

        tracing::info!(
            target: "sysmode.state",
            stage = "state.request.out",
            mode = d.name,
            from = old_state.as_deref().unwrap_or("<none>"),
            to = entry.name,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            persisted = report.persisted
        );
        Ok(report)
    }

    pub async fn request_state_by_name(
        &self,
        mode_name: &str,
        state_name: &str,
    ) -> Result<BroadcastReport, ModeError> {
        let mode = mode_by_name(mode_name)?;
        let state = ModeCatalog::state_from_name(mode, state_name).ok_or_else(|| {
            ModeError::invalid(format!("unknown state {state_name:?} for mode {mode_name}"))
        })?;
        self.request_state(mode, state).await
    }

    /// Numeric entry point for hosts that pass wire values.
    pub async fn request_state_raw(
        &self,
        mode: u32,
        state: u32,
    ) -> Result<BroadcastReport, ModeError> {
        let mode = ModeCatalog::mode_from_raw(mode)
            .ok_or_else(|| ModeError::invalid(format!("unknown mode {mode}")))?;
        let state = ModeCatalog::state_from_raw(mode, state)
            .ok_or_else(|| ModeError::invalid(format!("state {state} is not valid for {mode}")))?;
        self.request_state(mode, state).await
    }

    async fn broadcast(&self, snapshot: &NotifySnapshot, state: &str) -> BroadcastReport {
        let timeout = self.inner.options.listener_timeout;
        let calls = snapshot.iter().map(|handle| async move {
            let result = match timeout {
                Some(limit) => match tokio::time::timeout(limit, handle.request(state)).await {
                    Ok(r) => r,
                    Err(_) => Err(anyhow::anyhow!("timed out after {}ms", limit.as_millis())),
                },
                None => handle.request(state).await,
            };
            (handle.callsign(), result)
        });

        let mut report = BroadcastReport {
            state: state.to_string(),
            ts: chrono::Utc::now().to_rfc3339(),
            ..BroadcastReport::default()
        };
        for (callsign, result) in join_all(calls).await {
            Counters::bump(&self.inner.counters.notifications);
            match result {
                Ok(()) => report.delivered.push(callsign.to_string()),
                Err(e) => {
                    Counters::bump(&self.inner.counters.listener_failures);
                    tracing::warn!(
                        target: "sysmode.listener",
                        stage = "listener.request.failed",
                        mode = %snapshot.mode(),
                        callsign = callsign,
                        state = state,
                        error = %e
                    );
                    report.failed.push(ListenerFailure {
                        callsign: callsign.to_string(),
                        error: format!("{e:#}"),
                    });
                }
            }
        }
        report
    }

    /// Persisted state of `mode`, or the mode's default when nothing usable
    /// is stored.
    pub async fn get_state(&self, mode: SystemMode) -> Result<State, ModeError> {
        let d = descriptor(mode)?;
        self.read_state(d)
    }

    pub async fn get_state_by_name(&self, mode_name: &str) -> Result<State, ModeError> {
        let mode = mode_by_name(mode_name)?;
        self.get_state(mode).await
    }

    fn read_state(&self, d: &'static ModeDescriptor) -> Result<State, ModeError> {
        let stored = self.inner.records.current_state(d.name)?;
        let Some(name) = stored else {
            return Ok(d.default_state);
        };
        match ModeCatalog::state_from_name(d.mode, &name) {
            Some(state) => Ok(state),
            None => {
                tracing::warn!(
                    target: "sysmode.state",
                    stage = "state.get.unparsable",
                    mode = d.name,
                    stored = %name
                );
                Ok(d.default_state)
            }
        }
    }

    /// Registers the client named `callsign` for `mode_name`.
    ///
    /// An empty callsign or a callsign the resolver cannot open is a no-op.
    /// Re-activating a registered callsign replaces its handle. When the
    /// mode's catch-up latch is set, the new handle is sent the current state
    /// once.
    pub async fn client_activated(
        &self,
        callsign: &str,
        mode_name: &str,
    ) -> Result<Activation, ModeError> {
        let mode = mode_by_name(mode_name)?;
        self.activate(callsign, mode, true).await
    }

    async fn activate(
        &self,
        callsign: &str,
        mode: SystemMode,
        catch_up: bool,
    ) -> Result<Activation, ModeError> {
        let d = descriptor(mode)?;
        let callsign = callsign.trim();
        if callsign.is_empty() || self.is_shut_down() {
            return Ok(Activation::Ignored);
        }

        let Some(listener) = self.inner.resolver.resolve(callsign, mode).await else {
            tracing::debug!(
                target: "sysmode.listener",
                stage = "listener.resolve.none",
                mode = d.name,
                callsign = callsign
            );
            return Ok(Activation::Unresolved);
        };

        let handle = ClientHandle::new(callsign, listener);
        let replaced = {
            let _membership = self.lock_membership();
            if self.is_shut_down() {
                None
            } else {
                let replaced = self.inner.registry.register(mode, handle.clone());
                if let Err(e) = self.inner.records.add_callsign(d.name, callsign) {
                    self.persistence_failed(d.name, "add callsign", &e);
                }
                Some(replaced)
            }
        };
        // replaced handles are released outside the membership lock
        let Some(replaced) = replaced.map(|old| old.is_some()) else {
            tracing::debug!(
                target: "sysmode.state",
                stage = "state.client.activated.after_shutdown",
                mode = d.name,
                callsign = callsign
            );
            return Ok(Activation::Ignored);
        };
        Counters::bump(&self.inner.counters.activations);
        tracing::info!(
            target: "sysmode.state",
            stage = "state.client.activated",
            mode = d.name,
            callsign = callsign,
            replaced = replaced
        );

        let caught_up = if catch_up && self.is_requested(mode) {
            self.catch_up(d, &handle).await
        } else {
            None
        };
        Ok(Activation::Registered {
            replaced,
            caught_up,
        })
    }

    async fn catch_up(&self, d: &'static ModeDescriptor, handle: &ClientHandle) -> Option<State> {
        let state = match self.read_state(d) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    target: "sysmode.state",
                    stage = "state.catch_up.skipped",
                    mode = d.name,
                    callsign = handle.callsign(),
                    error = %e
                );
                return None;
            }
        };
        let name = d.entry(state)?.name;
        Counters::bump(&self.inner.counters.catch_ups);
        Counters::bump(&self.inner.counters.notifications);

        let result = match self.inner.options.listener_timeout {
            Some(limit) => tokio::time::timeout(limit, handle.request(name))
                .await
                .unwrap_or_else(|_| Err(anyhow::anyhow!("timed out after {}ms", limit.as_millis()))),
            None => handle.request(name).await,
        };
        match result {
            Ok(()) => {
                tracing::debug!(
                    target: "sysmode.listener",
                    stage = "listener.catch_up",
                    mode = d.name,
                    callsign = handle.callsign(),
                    state = name
                );
                Some(state)
            }
            Err(e) => {
                Counters::bump(&self.inner.counters.listener_failures);
                tracing::warn!(
                    target: "sysmode.listener",
                    stage = "listener.catch_up.failed",
                    mode = d.name,
                    callsign = handle.callsign(),
                    error = %e
                );
                None
            }
        }
    }

    /// Removes the client from the registry and, if it was registered, from
    /// the persisted set.
    ///
    /// Returns whether a registry entry existed. Deactivating an unknown
    /// callsign succeeds and changes nothing.
    pub async fn client_deactivated(
        &self,
        callsign: &str,
        mode_name: &str,
    ) -> Result<bool, ModeError> {
        let mode = mode_by_name(mode_name)?;
        let d = descriptor(mode)?;
        let callsign = callsign.trim();

        let removed = {
            let _membership = self.lock_membership();
            let removed = self.inner.registry.unregister(mode, callsign);
            if removed.is_some() {
                if let Err(e) = self.inner.records.remove_callsign(d.name, callsign) {
                    self.persistence_failed(d.name, "remove callsign", &e);
                }
            }
            removed
        };
        let found = removed.is_some();
        drop(removed);

        if found {
            Counters::bump(&self.inner.counters.deactivations);
        }
        tracing::info!(
            target: "sysmode.state",
            stage = "state.client.deactivated",
            mode = d.name,
            callsign = callsign,
            found = found
        );
        Ok(found)
    }

    /// Re-activates callsigns persisted by a previous run.
    ///
    /// Restored clients get no catch-up: they were registered, and so
    /// notified, when the persisted state was last requested. Callsigns the
    /// resolver cannot open are dropped from the persisted set.
    pub async fn restore_clients(&self) -> usize {
        let mut restored = 0;
        for d in ModeCatalog::descriptors() {
            let callsigns = match self.inner.records.registered_callsigns(d.name) {
                Ok(list) => list,
                Err(e) => {
                    self.persistence_failed(d.name, "read callsigns", &e);
                    continue;
                }
            };
            for callsign in callsigns {
                match self.activate(&callsign, d.mode, false).await {
                    Ok(Activation::Registered { .. }) => restored += 1,
                    Ok(Activation::Unresolved) => {
                        if let Err(e) = self.inner.records.remove_callsign(d.name, &callsign) {
                            self.persistence_failed(d.name, "remove callsign", &e);
                        }
                    }
                    Ok(Activation::Ignored) => {}
                    Err(e) => tracing::warn!(
                        target: "sysmode.state",
                        stage = "state.restore.failed",
                        mode = d.name,
                        callsign = %callsign,
                        error = %e
                    ),
                }
            }
        }
        tracing::info!(target: "sysmode.state", stage = "state.restore", restored = restored);
        restored
    }

    pub async fn status(&self, mode: SystemMode) -> Result<ModeStatus, ModeError> {
        let d = descriptor(mode)?;
        let state = self.read_state(d)?;
        Ok(ModeStatus {
            mode,
            state,
            state_name: d.entry(state).map(|e| e.name).unwrap_or_default().to_string(),
            requested: self.is_requested(mode),
            clients: self.inner.registry.callsigns(mode),
        })
    }

    pub fn registered_clients(&self, mode: SystemMode) -> Vec<String> {
        self.inner.registry.callsigns(mode)
    }

    pub fn stats(&self) -> ManagerStats {
        self.inner.counters.snapshot()
    }

    /// Releases every client handle and the resolver.
    ///
    /// Each release runs on its own, so a panic in one cannot skip the rest.
    /// Later activations are ignored; requests still persist state.
    pub fn shutdown(&self) {
        let drained = {
            let _membership = self.lock_membership();
            if self.inner.shut_down.swap(true, Ordering::SeqCst) {
                return;
            }
            self.inner.registry.clear()
        };
        let count = drained.len();
        for handle in drained {
            let callsign = handle.callsign().to_string();
            if catch_unwind(AssertUnwindSafe(move || drop(handle))).is_err() {
                tracing::error!(
                    target: "sysmode.state",
                    stage = "state.shutdown.release_failed",
                    callsign = %callsign
                );
            }
        }
        let resolver = self.inner.resolver.clone();
        if catch_unwind(AssertUnwindSafe(|| resolver.release())).is_err() {
            tracing::error!(
                target: "sysmode.state",
                stage = "state.shutdown.release_failed",
                resolver = %self.inner.resolver.name()
            );
        }
        tracing::info!(target: "sysmode.state", stage = "state.shutdown", released = count);
    }
}
