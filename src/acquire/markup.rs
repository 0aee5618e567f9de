//! Markup strategy: scrape cover and gallery images out of the page HTML.
//!
//! Used when the product API is unavailable or empty. Open Graph image tags
//! are taken as-is since they are the page's declared cover; `<img>` sources
//! are untrusted and only accepted when they look like a same-site image
//! file.

use super::{
    dedup_candidates, has_image_extension, resolve, same_site, CandidateAsset, FetchError,
    PageClient,
};
use crate::config::StrategyKind;
use scraper::{Html, Selector};
use std::sync::Arc;
use url::Url;

pub struct MarkupStrategy {
    client: Arc<PageClient>,
}

impl MarkupStrategy {
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
    let mut candidates = Vec::new();

    let meta_selector = Selector::parse(r#"meta[property^="og:image"]"#).unwrap();
    for element in document.select(&meta_selector) {
        let property = element.value().attr("property").unwrap_or("");
        if property != "og:image" && property != "og:image:secure_url" {
            continue;
        }
        if let Some(locator) = element.value().attr("content").and_then(|c| resolve(c, page_url)) {
            candidates.push(CandidateAsset::new(
                page_url.as_str(),
                locator,
                StrategyKind::Markup,
            ));
        }
    }

    let img_selector = Selector::parse("img[src]").unwrap();
    for element in document.select(&img_selector) {
        let Some(locator) = element.value().attr("src").and_then(|s| resolve(s, page_url)) else {
            continue;
        };
        if has_image_extension(&locator) && same_site(page_url, &locator) {
            candidates.push(CandidateAsset::new(
                page_url.as_str(),
                locator,
                StrategyKind::Markup,
            ));
        }
    }

    dedup_candidates(candidates)
}
