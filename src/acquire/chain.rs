//! Strategy trait and the ordered fallback chain.

use super::{dedup_candidates, CandidateAsset, FetchError};
use super::{ApiStrategy, EmbeddedJsonStrategy, MarkupStrategy, PageClient};
use crate::config::{SourceConfig, StrategyKind};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// One way of turning a product page URL into candidate assets.
#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn acquire(&self, product_url: &Url) -> Result<Vec<CandidateAsset>, FetchError>;
}

#[async_trait]
impl AcquisitionStrategy for ApiStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Api
    }

    async fn acquire(&self, product_url: &Url) -> Result<Vec<CandidateAsset>, FetchError> {
        self.fetch(product_url).await
    }
}

#[async_trait]
impl AcquisitionStrategy for MarkupStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Markup
    }

    async fn acquire(&self, product_url: &Url) -> Result<Vec<CandidateAsset>, FetchError> {
        self.fetch(product_url).await
    }
}

#[async_trait]
impl AcquisitionStrategy for EmbeddedJsonStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::EmbeddedJson
    }

    async fn acquire(&self, product_url: &Url) -> Result<Vec<CandidateAsset>, FetchError> {
        self.fetch(product_url).await
    }
}

/// Retry budget applied per strategy, per reference.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total tries, including the first.
    pub attempts: u32,
    /// Fixed delay between tries.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &SourceConfig) -> Self {
        Self {
            attempts: config.attempts.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Ordered strategies plus the retry policy. The chain itself never fails:
/// a reference for which everything failed simply contributes no
/// candidates.
pub struct AcquisitionChain {
    strategies: Vec<Box<dyn AcquisitionStrategy>>,
    retry: RetryPolicy,
}

impl AcquisitionChain {
    pub fn new(strategies: Vec<Box<dyn AcquisitionStrategy>>, retry: RetryPolicy) -> Self {
        Self { strategies, retry }
    }

    pub fn from_config(config: &SourceConfig, client: Arc<PageClient>) -> Self {
        let strategies: Vec<Box<dyn AcquisitionStrategy>> = config
            .strategies
            .iter()
            .map(|kind| match kind {
                StrategyKind::Api => {
                    Box::new(ApiStrategy::new(client.clone())) as Box<dyn AcquisitionStrategy>
                }
                StrategyKind::Markup => Box::new(MarkupStrategy::new(client.clone())),
                StrategyKind::EmbeddedJson => Box::new(EmbeddedJsonStrategy::new(client.clone())),
            })
            .collect();
        Self::new(strategies, RetryPolicy::from_config(config))
    }

    /// Acquire candidates for every configured reference and concatenate
    /// the results in reference order, de-duplicated across references.
    /// Comma-joined reference entries are already flattened by config
    /// loading.
    pub async fn acquire_all(&self, refs: &[String]) -> Vec<CandidateAsset> {
        let mut all = Vec::new();
        for reference in refs {
            match Url::parse(reference) {
                Ok(url) => all.extend(self.acquire(&url).await),
                Err(e) => {
                    warn!(reference, error = %e, "skipping unparseable product reference");
                }
            }
        }
        dedup_candidates(all)
    }

    /// Run the strategy chain for one reference, stopping at the first
    /// strategy that yields candidates.
    pub async fn acquire(&self, product_url: &Url) -> Vec<CandidateAsset> {
        for strategy in &self.strategies {
            match self.attempt(strategy.as_ref(), product_url).await {
                Ok(candidates) if !candidates.is_empty() => {
                    info!(
                        url = %product_url,
                        strategy = strategy.kind().as_str(),
                        count = candidates.len(),
                        "acquired candidates"
                    );
                    return candidates;
                }
                Ok(_) => {
                    debug!(
                        url = %product_url,
                        strategy = strategy.kind().as_str(),
                        "strategy found nothing, falling back"
                    );
                }
                Err(e) => {
                    warn!(
                        url = %product_url,
                        strategy = strategy.kind().as_str(),
                        error = %e,
                        "strategy failed, falling back"
                    );
                }
            }
        }
        warn!(url = %product_url, "no strategy produced candidates");
        Vec::new()
    }

    /// One strategy with its retry budget. Only transient failures consume
    /// retries; permanent ones surface immediately so the chain can fall
    /// back.
    async fn attempt(
        &self,
        strategy: &dyn AcquisitionStrategy,
        product_url: &Url,
    ) -> Result<Vec<CandidateAsset>, FetchError> {
        let mut attempt = 1;
        loop {
            match strategy.acquire(product_url).await {
                Ok(candidates) => return Ok(dedup_candidates(candidates)),
                Err(e) if e.is_transient() && attempt < self.retry.attempts => {
                    let delay = retry_delay(&e, self.retry.delay);
                    warn!(
                        url = %product_url,
                        strategy = strategy.kind().as_str(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Longest Retry-After we will honor before falling back to the fixed
/// delay cap.
const MAX_RETRY_AFTER_SECS: u64 = 10;

fn retry_delay(error: &FetchError, default: Duration) -> Duration {
    match error {
        FetchError::Status {
            retry_after: Some(secs),
            ..
        } => Duration::from_secs((*secs).min(MAX_RETRY_AFTER_SECS)),
        _ => default,
    }
}
