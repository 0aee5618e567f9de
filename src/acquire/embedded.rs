//! Embedded JSON strategy: structured data blocks inside the page HTML.
//!
//! Two sources, in order: `application/ld+json` blocks (Product and
//! ImageObject entities, including ones nested under `@graph`), then
//! `application/json` state blobs, which are walked recursively for
//! same-site image URLs. Blocks that fail to parse are skipped so one
//! malformed island cannot sink the strategy.

use super::{
    dedup_candidates, has_image_extension, resolve, same_site, CandidateAsset, FetchError,
    PageClient,
};
use crate::config::StrategyKind;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

pub struct EmbeddedJsonStrategy {
    client: Arc<PageClient>,
}

impl EmbeddedJsonStrategy {
    pub fn new(client: Arc<PageClient>) -> Self {
        Self { client }
    }

    pub(super) async fn fetch(&self, product_url: &Url) -> Result<Vec<CandidateAsset>, FetchError> {
        let html = self.client.get_text(product_url).await?;
        Ok(candidates_from_html(&html, product_url))
    }
}

fn candidates_from_html(html: &str, page_url: &Url) -> Vec<CandidateAsset> {
    let document = Html::parse_document(html);
    let mut urls = Vec::new();

    let jsonld_selector = Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();
    for element in document.select(&jsonld_selector) {
        let text = element.inner_html();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(text) {
            Ok(value) => collect_jsonld(&value, &mut urls),
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed ld+json block");
            }
        }
    }

    let state_selector = Selector::parse(r#"script[type="application/json"]"#).unwrap();
    for element in document.select(&state_selector) {
        let text = element.inner_html();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            collect_state_urls(&value, page_url, &mut urls);
        }
    }

    let candidates = urls
        .into_iter()
        .filter_map(|raw| resolve(&raw, page_url))
        .map(|locator| CandidateAsset::new(page_url.as_str(), locator, StrategyKind::EmbeddedJson))
        .collect();
    dedup_candidates(candidates)
}

/// Pull image URLs out of a JSON-LD document, descending into `@graph` and
/// top-level arrays.
fn collect_jsonld(value: &Value, out: &mut Vec<String>) {
    if let Some(graph) = value.get("@graph").and_then(|g| g.as_array()) {
        for item in graph {
            collect_jsonld_entity(item, out);
        }
        return;
    }
    if let Some(items) = value.as_array() {
        for item in items {
            collect_jsonld(item, out);
        }
        return;
    }
    collect_jsonld_entity(value, out);
}

fn collect_jsonld_entity(value: &Value, out: &mut Vec<String>) {
    let entity_type = value.get("@type").and_then(|t| t.as_str()).unwrap_or("");
    match entity_type {
        "Product" | "ProductGroup" => {
            if let Some(image) = value.get("image") {
                collect_image_field(image, out);
            }
        }
        "ImageObject" => {
            for key in ["contentUrl", "url"] {
                if let Some(url) = value.get(key).and_then(|u| u.as_str()) {
                    out.push(url.to_string());
                    break;
                }
            }
        }
        _ => {}
    }
}

/// The `image` property of a Product is a string, an array of strings, or
/// an array of ImageObjects.
fn collect_image_field(image: &Value, out: &mut Vec<String>) {
    match image {
        Value::String(url) => out.push(url.clone()),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(url) => out.push(url.clone()),
                    Value::Object(_) => collect_jsonld_entity(item, out),
                    _ => {}
                }
            }
        }
        Value::Object(_) => collect_jsonld_entity(image, out),
        _ => {}
    }
}

/// Walk an arbitrary state blob for strings that are same-site image URLs.
fn collect_state_urls(value: &Value, page_url: &Url, out: &mut Vec<String>) {
    match value {
        Value::String(text) => {
            if let Ok(url) = Url::parse(text) {
                if has_image_extension(&url) && same_site(page_url, &url) {
                    out.push(text.clone());
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_state_urls(item, page_url, out);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_state_urls(item, page_url, out);
            }
        }
        _ => {}
    }
}
