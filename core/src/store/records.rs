use std::sync::{Arc, Mutex, PoisonError};

use super::r#trait::ModeStore;
use crate::error::StoreError;

pub const KEY_CURRENT_STATE: &str = "currentstate";
pub const KEY_CALLSIGN: &str = "callsign";

const CALLSIGN_SEPARATOR: char = '|';

/// Typed records kept per mode on top of a [`ModeStore`].
///
/// The registered-client set lives in a single `callsign` value joined with
/// `|`. Updates to it are read-modify-write, so they are serialized here.
pub struct ModeRecords {
    store: Arc<dyn ModeStore>,
    callsign_lock: Mutex<()>,
}

impl ModeRecords {
    pub fn new(store: Arc<dyn ModeStore>) -> Self {
        Self {
            store,
            callsign_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn ModeStore> {
        &self.store
    }

    /// Stored state name; an empty value counts as absent.
    pub fn current_state(&self, section: &str) -> Result<Option<String>, StoreError> {
        let value = self.store.get(section, KEY_CURRENT_STATE)?;
        Ok(value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    pub fn write_current_state(&self, section: &str, state_name: &str) -> Result<(), StoreError> {
        self.store.set(section, KEY_CURRENT_STATE, state_name)
    }

    pub fn registered_callsigns(&self, section: &str) -> Result<Vec<String>, StoreError> {
        let raw = self.store.get(section, KEY_CALLSIGN)?;
        Ok(raw.as_deref().map(split_callsigns).unwrap_or_default())
    }

    /// Returns `false` when the callsign was already present.
    pub fn add_callsign(&self, section: &str, callsign: &str) -> Result<bool, StoreError> {
        let _guard = self
            .callsign_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut list = self.registered_callsigns(section)?;
        if list.iter().any(|c| c == callsign) {
            return Ok(false);
        }
        list.push(callsign.to_string());
        self.store.set(section, KEY_CALLSIGN, &join_callsigns(&list))?;
        Ok(true)
    }

    /// Returns `false` when the callsign was not present.
    pub fn remove_callsign(&self, section: &str, callsign: &str) -> Result<bool, StoreError> {
        let _guard = self
            .callsign_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut list = self.registered_callsigns(section)?;
        let before = list.len();
        list.retain(|c| c != callsign);
        if list.len() == before {
            return Ok(false);
        }
        if list.is_empty() {
            self.store.delete(section, KEY_CALLSIGN)?;
        } else {
            self.store.set(section, KEY_CALLSIGN, &join_callsigns(&list))?;
        }
        Ok(true)
    }

    pub fn clear_callsigns(&self, section: &str) -> Result<(), StoreError> {
        let _guard = self
            .callsign_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.store.delete(section, KEY_CALLSIGN)
    }
}

fn split_callsigns(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in raw.split(CALLSIGN_SEPARATOR) {
        let part = part.trim();
        if !part.is_empty() && !out.iter().any(|c| c == part) {
            out.push(part.to_string());
        }
    }
    out
}

fn join_callsigns(list: &[String]) -> String {
    list.join(&CALLSIGN_SEPARATOR.to_string())
}
