use crate::error::StoreError;

/// Durable key/value storage addressed by `(section, key)`.
///
/// Sections are mode names; keys are record names inside a mode. Backends
/// must be safe to call from several threads; there is no transaction across
/// calls.
pub trait ModeStore: Send + Sync {
    fn name(&self) -> &str;
    fn get(&self, section: &str, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, section: &str, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete(&self, section: &str, key: &str) -> Result<(), StoreError>;
}
