//! `ServicesFactory` backed by the plugins in this crate, shared by the CLI.
use async_trait::async_trait;
use sysmode_core::api::{AppConfig, Services, ServicesFactory};

use crate::factory;

#[derive(Default)]
pub struct PluginServicesFactory;

#[async_trait]
impl ServicesFactory for PluginServicesFactory {
    async fn build_services(&self, cfg: &AppConfig) -> anyhow::Result<Services> {
        let store = factory::build_store(cfg)?;
        let resolver = factory::build_resolver(cfg)?;
        tracing::debug!(
            target: "sysmode.services",
            stage = "services.build",
            store = store.name(),
            resolver = resolver.name()
        );
        Ok(Services { store, resolver })
    }
}
