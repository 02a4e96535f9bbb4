use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sysmode_core::api::{ListenerConfig, ListenerResolver, StateListener, SystemMode};

use super::http_client::HttpListener;

/// Resolves callsigns to [`HttpListener`]s using the `[listeners.endpoints]`
/// table. All listeners share one connection pool.
pub struct HttpListenerResolver {
    api_key: String,
    endpoints: BTreeMap<String, String>,
    http: reqwest::Client,
    released: AtomicBool,
}

impl HttpListenerResolver {
    pub fn new(cfg: &ListenerConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(cfg.timeout_ms))
            .build()?;
        Ok(Self {
            api_key: cfg.api_key.clone(),
            endpoints: cfg
                .endpoints
                .iter()
                .filter(|(_, url)| !url.trim().is_empty())
                .map(|(k, v)| (k.clone(), v.trim().to_string()))
                .collect(),
            http,
            released: AtomicBool::new(false),
        })
    }

    pub fn callsigns(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }
}

#[async_trait]
impl ListenerResolver for HttpListenerResolver {
    fn name(&self) -> &str {
        "http"
    }

    async fn resolve(&self, callsign: &str, mode: SystemMode) -> Option<Arc<dyn StateListener>> {
        if self.released.load(Ordering::SeqCst) {
            return None;
        }
        let Some(base_url) = self.endpoints.get(callsign) else {
            tracing::debug!(
                target: "sysmode.listener",
                stage = "listener.resolve.miss",
                callsign = callsign
            );
            return None;
        };
        Some(Arc::new(HttpListener::new(
            callsign,
            mode,
            base_url,
            self.api_key.clone(),
            self.http.clone(),
        )))
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
