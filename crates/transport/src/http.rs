//! Shared HTTP client.
//!
//! One pooled `reqwest::Client` serves every collaborator. Timeouts come
//! from [`HttpConfig`]; non-success statuses and undecodable bodies become
//! [`TransportError`]s carrying the URL and the server's answer.

use std::time::Duration;

use config::constants::{DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::TransportError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// TCP + TLS handshake timeout. Default: 10 s.
    pub connect_timeout: Duration,

    /// Per-request timeout. Default: 30 s.
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

impl HttpConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> HttpConfigBuilder {
        HttpConfigBuilder::default()
    }
}

/// Builder for [`HttpConfig`].
#[derive(Debug, Default)]
pub struct HttpConfigBuilder {
    connect_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl HttpConfigBuilder {
    pub fn connect_timeout(mut self, d: Duration) -> Self {
        self.connect_timeout = Some(d);
        self
    }

    pub fn request_timeout(mut self, d: Duration) -> Self {
        self.request_timeout = Some(d);
        self
    }

    pub fn build(self) -> HttpConfig {
        let defaults = HttpConfig::default();
        HttpConfig {
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
        }
    }
}

// ---------------------------------------------------------------------------
// HttpClient
// ---------------------------------------------------------------------------

/// Pooled HTTP client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let inner = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { inner })
    }

    /// `GET url`, decoding a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, TransportError> {
        let response = self.send(url, self.inner.get(url)).await?;
        decode_json(url, response).await
    }

    /// `POST url` with a JSON body, decoding a JSON answer.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        let response = self.send(url, self.inner.post(url).json(body)).await?;
        decode_json(url, response).await
    }

    /// `POST url` with a plain-text body, returning the trimmed text answer.
    pub async fn post_text(&self, url: &str, body: String) -> Result<String, TransportError> {
        let request = self
            .inner
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body);
        let response = self.send(url, request).await?;
        let text = response.text().await.map_err(|e| TransportError::Decode {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(text.trim().to_owned())
    }

    async fn send(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, TransportError> {
        debug!(url, "http request");
        let response = request.send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                "timed out".to_owned()
            } else {
                e.to_string()
            };
            warn!(url, reason = %reason, "http request failed");
            TransportError::Request {
                url: url.to_owned(),
                reason,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url, status = status.as_u16(), body = %body, "http request rejected");
            return Err(TransportError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

async fn decode_json<T: DeserializeOwned>(
    url: &str,
    response: reqwest::Response,
) -> Result<T, TransportError> {
    response.json::<T>().await.map_err(|e| {
        warn!(url, error = %e, "http response did not decode");
        TransportError::Decode {
            url: url.to_owned(),
            reason: e.to_string(),
        }
    })
}

/// Join a base URL and a path without doubling the slash.
pub(crate) fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
