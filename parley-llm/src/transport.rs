//! Shared HTTP plumbing for the adapters.

use crate::error::{LlmError, Result};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Caller-supplied client; when set, `timeout` is ignored.
    pub http: Option<reqwest::Client>,
}

impl TransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            http: None,
        }
    }
}

#[derive(Clone)]
pub(crate) struct HttpTransport {
    vendor: &'static str,
    base_url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    #[tracing::instrument(level = "debug", skip_all, fields(vendor = vendor))]
    pub(crate) fn new(vendor: &'static str, config: TransportConfig) -> Self {
        let http = match config.http {
            Some(client) => client,
            None => reqwest::Client::builder()
                .timeout(config.timeout)
                .build()
                .unwrap_or_else(|e| {
                    tracing::warn!(%e, "reqwest client build failed; falling back to default client");
                    reqwest::Client::new()
                }),
        };
        Self {
            vendor,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POSTs `body` as JSON and returns the raw response text. Any non-2xx status becomes
    /// [`LlmError::Status`] carrying the body.
    pub(crate) async fn post_json<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        body: &B,
    ) -> Result<String> {
        let payload = serde_json::to_vec(body).map_err(|e| LlmError::encode(self.vendor, e))?;
        let url = self.url(path);

        let mut request = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LlmError::http(self.vendor, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::http(self.vendor, e))?;

        if !status.is_success() {
            tracing::warn!(
                vendor = self.vendor,
                status = status.as_u16(),
                body_len = text.len(),
                "provider returned non-success status"
            );
            return Err(LlmError::Status {
                vendor: self.vendor,
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    pub(crate) fn decode<T: serde::de::DeserializeOwned>(&self, body: &str) -> Result<T> {
        serde_json::from_str(body).map_err(|e| LlmError::decode(self.vendor, e))
    }
}
