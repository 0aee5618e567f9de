//! Acquisition of candidate assets from upstream product pages.
//!
//! A configured upstream reference is resolved into candidate image URLs by
//! an ordered chain of strategies: a structured product API, a scrape of the
//! page markup, and extraction from JSON embedded in the page. The chain
//! stops at the first strategy that yields anything; partial results from
//! different strategies are never merged because they can represent
//! different views of the same product (cover only vs. full gallery).

mod api;
mod chain;
mod client;
mod embedded;
mod markup;

pub use api::ApiStrategy;
pub use chain::{AcquisitionChain, AcquisitionStrategy, RetryPolicy};
pub use client::PageClient;
pub use embedded::EmbeddedJsonStrategy;
pub use markup::MarkupStrategy;

use crate::config::StrategyKind;
use std::collections::HashSet;
use url::{Position, Url};

/// Image extensions accepted for candidates discovered in page markup or
/// embedded state, where URLs are untrusted strings.
const CANDIDATE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// A not-yet-downloaded pointer to one upstream image.
#[derive(Debug, Clone)]
pub struct CandidateAsset {
    /// The upstream reference this candidate was discovered for.
    pub source_ref: String,
    /// Where the image lives.
    pub locator: Url,
    /// Which strategy produced it.
    pub discovered_via: StrategyKind,
}

impl CandidateAsset {
    pub fn new(source_ref: impl Into<String>, locator: Url, via: StrategyKind) -> Self {
        Self {
            source_ref: source_ref.into(),
            locator,
            discovered_via: via,
        }
    }

    /// De-duplication identity of this candidate.
    pub fn identity(&self) -> String {
        normalize_locator(&self.locator)
    }
}

/// Normalized form of a locator: scheme, host, and path, with the query and
/// fragment stripped. Two URLs that differ only in tracking parameters
/// normalize to the same identity.
pub fn normalize_locator(url: &Url) -> String {
    url[..Position::AfterPath].to_string()
}

/// Drop candidates whose normalized locator was already seen, keeping the
/// first occurrence and the original order.
pub fn dedup_candidates(candidates: Vec<CandidateAsset>) -> Vec<CandidateAsset> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.identity()))
        .collect()
}

/// How a fetch failure should be handled by the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Worth retrying with the strategy's remaining attempt budget.
    Transient,
    /// Retrying cannot help; fall back to the next strategy immediately.
    Permanent,
}

/// Errors produced while fetching or interpreting upstream data.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connection failures, timeouts, protocol errors.
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("upstream returned {status} for {url}")]
    Status {
        status: u16,
        url: String,
        /// Seconds from a Retry-After header, when the upstream sent one.
        retry_after: Option<u64>,
    },

    /// The response did not have the shape the strategy expects.
    #[error("unexpected payload from {url}: {message}")]
    Schema { url: String, message: String },
}

impl FetchError {
    /// Create a schema mismatch error.
    pub fn schema(url: &Url, message: impl Into<String>) -> Self {
        Self::Schema {
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// Classify this failure for the retry policy: rate limits, 5xx, and
    /// network errors are transient; other status codes and schema
    /// mismatches are permanent.
    pub fn classify(&self) -> FailureClass {
        match self {
            FetchError::Network(_) => FailureClass::Transient,
            FetchError::Status { status, .. } => {
                if *status == 429 || *status >= 500 {
                    FailureClass::Transient
                } else {
                    FailureClass::Permanent
                }
            }
            FetchError::Schema { .. } => FailureClass::Permanent,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.classify() == FailureClass::Transient
    }
}

/// Resolve a possibly-relative URL reference against the page it appeared
/// on, keeping only http(s) results.
pub(crate) fn resolve(raw: &str, base: &Url) -> Option<Url> {
    let url = base.join(raw.trim()).ok()?;
    if matches!(url.scheme(), "http" | "https") {
        Some(url)
    } else {
        None
    }
}

/// Whether the URL path ends in an accepted image extension.
pub(crate) fn has_image_extension(url: &Url) -> bool {
    std::path::Path::new(url.path())
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| CANDIDATE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Whether an asset URL belongs to the same site as the product page,
/// comparing the registrable suffix of the hosts so CDN subdomains count.
pub(crate) fn same_site(page: &Url, asset: &Url) -> bool {
    match (page.host_str(), asset.host_str()) {
        (Some(page_host), Some(asset_host)) => domain_suffix(page_host) == domain_suffix(asset_host),
        _ => false,
    }
}

fn domain_suffix(host: &str) -> String {
    let labels: Vec<&str> = host.rsplit('.').take(2).collect();
    labels
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join(".")
        .to_lowercase()
}
