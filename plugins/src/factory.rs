use std::sync::Arc;

use anyhow::Result;

use sysmode_core::api::{AppConfig, ListenerResolver, MemoryStore, ModeStore, StoreProvider};

use crate::listener::HttpListenerResolver;
use crate::store::FileStore;

pub fn build_store(cfg: &AppConfig) -> Result<Arc<dyn ModeStore>> {
    match &cfg.store.provider {
        StoreProvider::File(file_cfg) => {
            if file_cfg.path.trim().is_empty() {
                anyhow::bail!("store.path is empty (file provider needs a path)");
            }
            Ok(Arc::new(FileStore::new(file_cfg.path.trim())))
        }
        StoreProvider::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

pub fn build_resolver(cfg: &AppConfig) -> Result<Arc<dyn ListenerResolver>> {
    Ok(Arc::new(HttpListenerResolver::new(&cfg.listeners)?))
}
