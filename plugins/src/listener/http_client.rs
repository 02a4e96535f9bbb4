use async_trait::async_trait;
use serde::Serialize;
use sysmode_core::api::{StateListener, SystemMode};
use thiserror::Error;

const BODY_EXCERPT_CHARS: usize = 512;

/// Why a state could not be handed to an HTTP client.
#[derive(Error, Debug)]
pub enum ListenerHttpError {
    #[error("listener {url} timed out")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("listener {url} unreachable: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("listener {url} rejected the request with {status}: {body}")]
    Rejected { url: String, status: u16, body: String },
    #[error("listener {url} request failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ListenerHttpError {
    fn transport(source: reqwest::Error, url: &str) -> Self {
        let url = url.to_string();
        if source.is_timeout() {
            Self::Timeout { url, source }
        } else if source.is_connect() {
            Self::Connect { url, source }
        } else {
            Self::Transport { url, source }
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url, .. }
            | Self::Connect { url, .. }
            | Self::Rejected { url, .. }
            | Self::Transport { url, .. } => url,
        }
    }

    /// HTTP status of a rejected request.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn body_excerpt(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct StateRequestPayload<'a> {
    mode: &'a str,
    state: &'a str,
}

/// Client reached over HTTP: `POST <base_url>/request` with
/// `{"mode": "...", "state": "..."}`. Any 2xx counts as accepted.
#[derive(Clone)]
pub struct HttpListener {
    callsign: String,
    mode: String,
    api_key: String,
    http: reqwest::Client,
    url_request: String,
}

impl HttpListener {
    pub fn new(
        callsign: impl Into<String>,
        mode: SystemMode,
        base_url: &str,
        api_key: String,
        http: reqwest::Client,
    ) -> Self {
        Self {
            callsign: callsign.into(),
            mode: mode.to_string(),
            api_key,
            http,
            url_request: format!("{}/request", base_url.trim_end_matches('/')),
        }
    }

    pub fn url(&self) -> &str {
        &self.url_request
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.trim().is_empty() {
            req
        } else {
            req.bearer_auth(&self.api_key)
        }
    }

    async fn send(&self, state: &str) -> Result<(), ListenerHttpError> {
        let url = &self.url_request;
        let payload = StateRequestPayload {
            mode: &self.mode,
            state,
        };
        tracing::debug!(
            target: "sysmode.listener",
            stage = "listener.http.request.in",
            callsign = %self.callsign,
            url = %url,
            state = state
        );
        let req = self.http.post(url).json(&payload);
        let resp = self
            .auth(req)
            .send()
            .await
            .map_err(|err| ListenerHttpError::transport(err, url))?;
        let status = resp.status();
        if !status.is_success() {
            // an unreadable body still leaves the status worth reporting
            let body = resp.text().await.unwrap_or_default();
            return Err(ListenerHttpError::Rejected {
                url: url.clone(),
                status: status.as_u16(),
                body: body_excerpt(&body),
            });
        }
        tracing::debug!(
            target: "sysmode.listener",
            stage = "listener.http.request.out",
            callsign = %self.callsign,
            status = %status
        );
        Ok(())
    }
}

#[async_trait]
impl StateListener for HttpListener {
    async fn request(&self, state: &str) -> anyhow::Result<()> {
        self.send(state).await.map_err(anyhow::Error::new)
    }
}
