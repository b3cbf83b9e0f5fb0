//! DuckDuckGo-backed implementation of the search collaborator traits.
//!
//! Text search goes through the HTML endpoint (`html.duckduckgo.com`),
//! parsed with `scraper`. Image search first fetches the regular results
//! page to extract the `vqd` request token, then queries the `i.js` JSON
//! endpoint with the size/layout filters.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use docweaver_shared::{DocweaverError, Result, WebSnippet};

use crate::{ImageLayout, ImageSearch, ImageSize, TextSearch};

/// Default endpoint for HTML text search.
const DEFAULT_HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Default origin for the vqd token page and the `i.js` image endpoint.
const DEFAULT_BASE_ENDPOINT: &str = "https://duckduckgo.com";

/// Timeout for search requests.
const SEARCH_TIMEOUT_SECS: u64 = 10;

/// Browser-like identification; the search surfaces reject bot agents.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Matches the `vqd` request token embedded in the results page.
static VQD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"vqd=['"]?([\d-]+)"#).expect("vqd regex"));

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Search client over the DuckDuckGo surfaces.
pub struct DuckDuckGo {
    client: reqwest::Client,
    html_endpoint: String,
    base_endpoint: String,
}

impl DuckDuckGo {
    /// Create a client against the public endpoints.
    pub fn new() -> Result<Self> {
        Self::with_endpoints(DEFAULT_HTML_ENDPOINT, DEFAULT_BASE_ENDPOINT)
    }

    /// Create a client against specific endpoints (tests, proxies).
    pub fn with_endpoints(
        html_endpoint: impl Into<String>,
        base_endpoint: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| DocweaverError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            html_endpoint: html_endpoint.into(),
            base_endpoint: base_endpoint.into(),
        })
    }

    /// Fetch the `vqd` token required by the image endpoint.
    async fn fetch_vqd(&self, keyword: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.base_endpoint)
            .query(&[("q", keyword), ("iax", "images"), ("ia", "images")])
            .send()
            .await
            .map_err(|e| DocweaverError::Search(format!("vqd fetch: {e}")))?;

        let body = response
            .text()
            .await
            .map_err(|e| DocweaverError::Search(format!("vqd body read: {e}")))?;

        VQD_RE
            .captures(&body)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| DocweaverError::Search("no vqd token in results page".into()))
    }
}

#[async_trait]
impl TextSearch for DuckDuckGo {
    #[instrument(skip(self))]
    async fn search_text(&self, keyword: &str, max_results: usize) -> Result<Vec<WebSnippet>> {
        // Region worldwide, results from the last year for recency.
        let form = [("q", keyword), ("kl", "wt-wt"), ("df", "y")];

        let response = self
            .client
            .post(&self.html_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| DocweaverError::Search(format!("text search: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocweaverError::Search(format!(
                "text search: HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DocweaverError::Search(format!("text search body: {e}")))?;

        let results = parse_text_results(&body, max_results);
        debug!(keyword, count = results.len(), "text search complete");
        Ok(results)
    }
}

#[async_trait]
impl ImageSearch for DuckDuckGo {
    #[instrument(skip(self))]
    async fn search_images(
        &self,
        keyword: &str,
        size: ImageSize,
        layout: Option<ImageLayout>,
        max_results: usize,
    ) -> Result<Vec<String>> {
        let vqd = self.fetch_vqd(keyword).await?;
        let filters = build_image_filters(size, layout);

        let url = format!("{}/i.js", self.base_endpoint);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("l", "wt-wt"),
                ("o", "json"),
                ("q", keyword),
                ("vqd", vqd.as_str()),
                ("f", filters.as_str()),
                ("p", "-1"),
            ])
            .send()
            .await
            .map_err(|e| DocweaverError::Search(format!("image search: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocweaverError::Search(format!(
                "image search: HTTP {status}"
            )));
        }

        let payload: ImagePayload = response
            .json()
            .await
            .map_err(|e| DocweaverError::Search(format!("image payload: {e}")))?;

        let urls: Vec<String> = payload
            .results
            .into_iter()
            .filter_map(|r| r.image)
            .filter(|u| !u.is_empty())
            .take(max_results)
            .collect();

        debug!(keyword, count = urls.len(), "image search complete");
        Ok(urls)
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Response shape of the `i.js` image endpoint.
#[derive(Debug, Deserialize)]
struct ImagePayload {
    #[serde(default)]
    results: Vec<ImageResult>,
}

#[derive(Debug, Deserialize)]
struct ImageResult {
    image: Option<String>,
}

/// Build the `f` filter string, e.g. `size:Large,layout:Wide`.
fn build_image_filters(size: ImageSize, layout: Option<ImageLayout>) -> String {
    let mut parts = vec![format!("size:{}", size.as_filter())];
    if let Some(layout) = layout {
        parts.push(format!("layout:{}", layout.as_filter()));
    }
    parts.join(",")
}

/// Parse the HTML results page into snippets, in page order.
fn parse_text_results(html: &str, max_results: usize) -> Vec<WebSnippet> {
    let doc = Html::parse_document(html);
    let result_sel = Selector::parse("div.result").unwrap();
    let title_sel = Selector::parse("a.result__a").unwrap();
    let snippet_sel = Selector::parse("a.result__snippet, div.result__snippet").unwrap();

    let mut results = Vec::new();

    for element in doc.select(&result_sel) {
        let Some(anchor) = element.select(&title_sel).next() else {
            continue;
        };
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };

        let title = anchor.text().collect::<String>().trim().to_string();
        let summary = element
            .select(&snippet_sel)
            .next()
            .map(|s| s.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        let url = resolve_result_url(href);
        if title.is_empty() || url.is_empty() {
            continue;
        }

        results.push(WebSnippet {
            title,
            url,
            summary,
        });

        if results.len() == max_results {
            break;
        }
    }

    if results.is_empty() {
        warn!("text search page contained no parseable results");
    }

    results
}

/// Unwrap the redirect links the HTML endpoint uses (`/l/?uddg=<encoded>`),
/// falling back to the raw href.
fn resolve_result_url(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    if let Ok(parsed) = Url::parse(&absolute) {
        if parsed.path().starts_with("/l/") {
            if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "uddg") {
                return target.into_owned();
            }
        }
    }

    absolute
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
