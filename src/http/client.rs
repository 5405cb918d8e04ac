use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use octocrab::Octocrab;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::transport::{HttpMethod, RawResponse, RestTransport};
use crate::github::GitHubError;

/// Connection settings for [`RateLimitedHttpClient`].
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub api_url: String,
    pub token: String,
    pub requests_per_second: u32,
    pub burst_capacity: u32,
    pub request_timeout: Duration,
}

/// Rate-limited HTTP client that wraps Octocrab's raw request verbs.
///
/// Octocrab supplies the bearer token and connection handling; this type adds a
/// client-side request budget and a per-call timeout. It adds no retries of its own.
pub struct RateLimitedHttpClient {
    octocrab: Octocrab,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    api_url: String,
    request_timeout: Duration,
}

impl fmt::Debug for RateLimitedHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitedHttpClient")
            .field("api_url", &self.api_url)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl RateLimitedHttpClient {
    pub fn new(settings: TransportSettings) -> Result<Self, GitHubError> {
        let per_second = NonZeroU32::new(settings.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(settings.burst_capacity).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(per_second).allow_burst(burst);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        let api_url = settings.api_url.trim_end_matches('/').to_string();
        let octocrab = Octocrab::builder()
            .base_uri(api_url.as_str())?
            .personal_token(settings.token)
            .build()?;

        Ok(Self {
            octocrab,
            rate_limiter,
            api_url,
            request_timeout: settings.request_timeout,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Resolve a relative API path against the configured API root.
    /// Absolute URLs (continuation links) are used as given.
    pub fn request_uri(&self, path: &str) -> String {
        if path.starts_with("https://") || path.starts_with("http://") {
            path.to_string()
        } else {
            format!("{}/{}", self.api_url, path.trim_start_matches('/'))
        }
    }

    async fn send(
        &self,
        method: HttpMethod,
        uri: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<RawResponse, GitHubError> {
        let response = match method {
            HttpMethod::Get => self.octocrab._get(uri).await?,
            HttpMethod::Post => self.octocrab._post(uri, body).await?,
            HttpMethod::Put => self.octocrab._put(uri, body).await?,
            HttpMethod::Patch => self.octocrab._patch(uri, body).await?,
            HttpMethod::Delete => self.octocrab._delete(uri, body).await?,
        };

        let status = response.status().as_u16();
        let link = response
            .headers()
            .get("link")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = self.octocrab.body_to_string(response).await?;

        Ok(RawResponse {
            status,
            link,
            body: body.into_bytes(),
        })
    }
}

#[async_trait]
impl RestTransport for RateLimitedHttpClient {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<RawResponse, GitHubError> {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;

        let uri = self.request_uri(path);
        debug!(%method, %uri, "Sending GitHub API request");

        tokio::time::timeout(self.request_timeout, self.send(method, &uri, body))
            .await
            .map_err(|_| GitHubError::Timeout {
                operation: format!("{method} {path}"),
                duration_ms: self.request_timeout.as_millis() as u64,
            })?
    }
}
