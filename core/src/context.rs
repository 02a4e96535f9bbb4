use crate::config::AppConfig;
use crate::listener::ListenerResolver;
use crate::state::{ManagerOptions, StateManager};
use crate::store::ModeStore;
use std::sync::Arc;

/// Collaborators the state manager is built from.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn ModeStore>,
    pub resolver: Arc<dyn ListenerResolver>,
}

#[async_trait::async_trait]
pub trait ServicesFactory: Send + Sync {
    async fn build_services(&self, cfg: &AppConfig) -> anyhow::Result<Services>;
}

#[derive(Clone)]
pub struct AppContext {
    cfg: AppConfig,
    services_factory: Option<Arc<dyn ServicesFactory>>,
}

impl AppContext {
    pub fn new(cfg: AppConfig, services_factory: Option<Arc<dyn ServicesFactory>>) -> Self {
        Self {
            cfg,
            services_factory,
        }
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn with_config(&self, cfg: AppConfig) -> Self {
        Self {
            cfg,
            services_factory: self.services_factory.clone(),
        }
    }

    pub async fn build_services(&self) -> anyhow::Result<Services> {
        let Some(factory) = self.services_factory.as_ref() else {
            anyhow::bail!("services_factory missing (cannot build store/resolver)");
        };
        factory.build_services(&self.cfg).await
    }

    /// Builds the manager from configured services, restoring persisted
    /// clients when the configuration asks for it.
    pub async fn build_manager(&self) -> anyhow::Result<StateManager> {
        let services = self.build_services().await?;
        let options = ManagerOptions::from(&self.cfg.manager);
        let restore = options.restore_clients;
        let manager = StateManager::new(services.store, services.resolver, options);
        if restore {
            manager.restore_clients().await;
        }
        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::StaticResolver;
    use crate::store::MemoryStore;

    struct InMemoryFactory;

    #[async_trait::async_trait]
    impl ServicesFactory for InMemoryFactory {
        async fn build_services(&self, _cfg: &AppConfig) -> anyhow::Result<Services> {
            Ok(Services {
                store: Arc::new(MemoryStore::new()),
                resolver: Arc::new(StaticResolver::new()),
            })
        }
    }

    #[tokio::test]
    async fn test_build_manager_requires_factory() {
        let ctx = AppContext::new(AppConfig::default(), None);
        assert!(ctx.build_manager().await.is_err());
    }

    #[tokio::test]
    async fn test_build_manager_with_factory() {
        let ctx = AppContext::new(AppConfig::default(), Some(Arc::new(InMemoryFactory)));
        let manager = ctx.build_manager().await.unwrap();
        assert_eq!(
            manager
                .get_state(crate::catalog::SystemMode::DeviceOptimize)
                .await
                .unwrap(),
            crate::catalog::State::Video
        );
    }
}
