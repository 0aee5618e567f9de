//! Shared HTTP client for upstream page and asset fetches.

use super::FetchError;
use crate::config::SourceConfig;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;
use url::Url;

/// Requests per second against the upstream host.
const REQUESTS_PER_SECOND: u32 = 4;

/// Rate-limited HTTP client used by every acquisition strategy and by the
/// asset download step. Rate limiting is process-wide so the strategy
/// fallback chain cannot hammer the upstream during retries.
pub struct PageClient {
    client: reqwest::Client,
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl PageClient {
    pub fn new(config: &SourceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("failed to build reqwest client");

        let quota = Quota::per_second(NonZeroU32::new(REQUESTS_PER_SECOND).unwrap());

        Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
        }
    }

    /// Fetch a URL as text (HTML pages).
    pub async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        let response = self.get(url, None).await?;
        Ok(response.text().await?)
    }

    /// Fetch a URL as text with an explicit Accept header (API endpoints).
    pub async fn get_text_accepting(&self, url: &Url, accept: &str) -> Result<String, FetchError> {
        let response = self.get(url, Some(accept)).await?;
        Ok(response.text().await?)
    }

    /// Fetch a URL as raw bytes (image downloads).
    pub async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self.get(url, None).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn get(&self, url: &Url, accept: Option<&str>) -> Result<reqwest::Response, FetchError> {
        self.rate_limiter.until_ready().await;

        let mut request = self.client.get(url.clone());
        if let Some(accept) = accept {
            request = request.header(reqwest::header::ACCEPT, accept);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                retry_after,
            });
        }

        Ok(response)
    }
}
