//! HTTP transports for tile requests.
//!
//! [`HttpTransport`] talks to the real endpoint with reqwest.
//! [`StaticTransport`] serves canned responses for tests and offline runs.
//! Both race every request against the tile's cancellation token.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{FetchError, FetchResult};

/// A buffered HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct TileResponse {
    pub status: u16,
    pub status_text: String,
    /// Header names are stored lowercased.
    headers: HashMap<String, String>,
    pub body: Bytes,
}

impl TileResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: canonical_reason(status).to_string(),
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(404, Bytes::new())
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_headers<I>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        headers
            .into_iter()
            .fold(self, |response, (name, value)| response.with_header(name, value))
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

fn canonical_reason(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

/// Executes GET requests for tile payloads.
#[async_trait]
pub trait TileTransport: Send + Sync {
    /// Fetch `url`, resolving to [`FetchError::Cancelled`] as soon as
    /// `cancel` fires. Non-success statuses are returned, not raised.
    async fn get(&self, url: &str, cancel: &CancellationToken) -> FetchResult<TileResponse>;
}

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
            pool_max_idle_per_host: 16,
            user_agent: format!("fourwings-heatmap/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(config.user_agent.clone())
            .tcp_nodelay(true)
            .build()?;
        Ok(Self { client })
    }

    async fn send(&self, url: &str) -> FetchResult<TileResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect::<Vec<_>>();
        let body = response.bytes().await?;

        Ok(TileResponse::new(status.as_u16(), body)
            .with_status_text(status.canonical_reason().unwrap_or(""))
            .with_headers(headers))
    }
}

#[async_trait]
impl TileTransport for HttpTransport {
    async fn get(&self, url: &str, cancel: &CancellationToken) -> FetchResult<TileResponse> {
        debug!(url = %url, "Requesting tile");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            response = self.send(url) => response,
        }
    }
}

/// In-memory transport answering from registered routes.
///
/// The first route whose pattern is contained in the request URL answers;
/// unmatched URLs get a 404. Every requested URL is recorded.
#[derive(Debug, Default)]
pub struct StaticTransport {
    routes: Vec<(String, TileResponse)>,
    delay: Option<Duration>,
    requests: Mutex<Vec<String>>,
}

impl StaticTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, pattern: impl Into<String>, response: TileResponse) -> Self {
        self.routes.push((pattern.into(), response));
        self
    }

    /// Delay every response, so cancellation can be observed mid-flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn respond(&self, url: &str) -> TileResponse {
        self.routes
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(TileResponse::not_found)
    }
}

#[async_trait]
impl TileTransport for StaticTransport {
    async fn get(&self, url: &str, cancel: &CancellationToken) -> FetchResult<TileResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        let delay = self.delay.unwrap_or(Duration::ZERO);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(self.respond(url)),
        }
    }
}
