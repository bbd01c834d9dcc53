//! HTTP client that posts metrics payloads to the ingest endpoint.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use autopatch_core::config::metrics::MetricsConfig;

use crate::error::MetricsError;
use crate::retry::{RetryPolicy, with_backoff};

/// Media type of every payload and of the expected response.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Header carrying the access token.
pub const ACCESS_TOKEN_HEADER: &str = "lightstep-access-token";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends opaque, already-encoded metrics payloads.
///
/// Transport failures are retried under the [`RetryPolicy`] budget. HTTP
/// error statuses are not failures: the response is handed back as is.
#[derive(Debug, Clone)]
pub struct MetricsReporter {
    config: MetricsConfig,
    url: String,
    headers: HeaderMap,
    client: Client,
    retry: RetryPolicy,
}

impl MetricsReporter {
    /// Creates a reporter for `config`.
    pub fn new(config: MetricsConfig) -> Result<Self, MetricsError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(MetricsError::Client)?;

        let headers = build_headers(&config.token)?;
        let url = config.endpoint();

        Ok(Self {
            config,
            url,
            headers,
            client,
            retry: RetryPolicy::default(),
        })
    }

    /// Creates a reporter configured from the `LIGHTSTEP_*` environment.
    pub fn from_env() -> Result<Self, MetricsError> {
        Self::new(MetricsConfig::from_env())
    }

    /// Replaces the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Posts `content` to the endpoint.
    pub async fn send(&self, content: Bytes) -> Result<reqwest::Response, MetricsError> {
        debug!(url = %self.url, bytes = content.len(), "Sending metrics");

        let response = with_backoff(&self.retry, "metrics send", || {
            let request = self
                .client
                .post(&self.url)
                .headers(self.headers.clone())
                .body(content.clone());
            async move {
                request
                    .send()
                    .await
                    .map_err(|source| MetricsError::Transport {
                        url: self.url.clone(),
                        source,
                    })
            }
        })
        .await?;

        debug!(url = %self.url, status = %response.status(), "Metrics delivered");
        Ok(response)
    }

    /// Returns the endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Returns the retry policy in use.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}

fn build_headers(token: &str) -> Result<HeaderMap, MetricsError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(OCTET_STREAM));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));

    let mut token = HeaderValue::from_str(token).map_err(|_| MetricsError::InvalidToken)?;
    token.set_sensitive(true);
    headers.insert(HeaderName::from_static(ACCESS_TOKEN_HEADER), token);

    Ok(headers)
}
