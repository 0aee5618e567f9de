//! Product API strategy: the structured JSON endpoint behind a product page.
//!
//! Most marketplace product pages expose their data at `<page URL>.json`.
//! This is the preferred source because it lists the full cover gallery in
//! order, without any markup scraping.

use super::{dedup_candidates, resolve, CandidateAsset, FetchError, PageClient};
use crate::config::StrategyKind;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

pub struct ApiStrategy {
    client: Arc<PageClient>,
}

#[derive(Debug, Deserialize)]
struct ProductDocument {
    product: Product,
}

#[derive(Debug, Deserialize)]
struct Product {
    #[serde(default)]
    covers: Vec<CoverRef>,
    #[serde(default)]
    preview_url: Option<String>,
}

/// Covers appear either as plain URL strings or as objects with a `url`
/// field, depending on the upstream version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CoverRef {
    Url(String),
    Object { url: String },
}

impl CoverRef {
    fn url(&self) -> &str {
        match self {
            CoverRef::Url(url) => url,
            CoverRef::Object { url } => url,
        }
    }
}

impl ApiStrategy {
    pub fn new(client: Arc<PageClient>) -> Self {
        Self { client }
    }

    /// The JSON endpoint for a product page: the page path with `.json`
    /// appended and any query stripped.
    fn endpoint(product_url: &Url) -> Url {
        let mut endpoint = product_url.clone();
        let path = format!("{}.json", endpoint.path().trim_end_matches('/'));
        endpoint.set_path(&path);
        endpoint.set_query(None);
        endpoint.set_fragment(None);
        endpoint
    }

    pub(super) async fn fetch(&self, product_url: &Url) -> Result<Vec<CandidateAsset>, FetchError> {
        let endpoint = Self::endpoint(product_url);
        let body = self
            .client
            .get_text_accepting(&endpoint, "application/json")
            .await?;
        candidates_from_json(&body, &endpoint, product_url)
    }
}

fn candidates_from_json(
    body: &str,
    endpoint: &Url,
    product_url: &Url,
) -> Result<Vec<CandidateAsset>, FetchError> {
    let document: ProductDocument = serde_json::from_str(body)
        .map_err(|e| FetchError::schema(endpoint, format!("not a product document: {e}")))?;

    let mut candidates = Vec::new();
    for cover in &document.product.covers {
        if let Some(locator) = resolve(cover.url(), product_url) {
            candidates.push(CandidateAsset::new(
                product_url.as_str(),
                locator,
                StrategyKind::Api,
            ));
        }
    }
    if let Some(preview) = &document.product.preview_url {
        if let Some(locator) = resolve(preview, product_url) {
            candidates.push(CandidateAsset::new(
                product_url.as_str(),
                locator,
                StrategyKind::Api,
            ));
        }
    }

    Ok(dedup_candidates(candidates))
}
