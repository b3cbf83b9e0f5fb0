//! Tiered image search, download, and quality gating.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use docweaver_search::{ImageLayout, ImageSearch, ImageSize};
use docweaver_shared::{DocweaverError, Result};

/// Candidate URLs requested from the collaborator tiers.
pub const TIER_A_MAX_CANDIDATES: usize = 10;

/// Candidate cap for the backup crawler tier.
pub const BACKUP_MAX_CANDIDATES: usize = 15;

/// Minimum accepted payload in the primary pipeline flow.
pub const PRIMARY_MIN_BYTES: u64 = 50 * 1024;

/// Default minimum for the generic path (caller-tunable).
pub const DEFAULT_MIN_BYTES: u64 = 30 * 1024;

/// Per-candidate download timeout.
const DOWNLOAD_TIMEOUT_SECS: u64 = 15;

/// Default backup image-search surface for the Tier C scrape.
const DEFAULT_BACKUP_ENDPOINT: &str = "https://www.bing.com";

/// Browser-like identification; image hosts reject bot agents.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// A validated, persisted image associated with one section.
#[derive(Debug, Clone)]
pub struct AcquiredAsset {
    /// Absolute path of the downloaded file.
    pub local_path: PathBuf,
    /// The keyword that found the image.
    pub source_keyword: String,
    /// Payload size in bytes; always above the configured minimum.
    pub byte_size: u64,
}

/// Result of one acquisition attempt. `NoAsset` is the normal degraded
/// outcome; it carries diagnostics so the failure can be reported without
/// being treated as an error.
#[derive(Debug, Clone)]
pub enum MediaOutcome {
    Asset(AcquiredAsset),
    NoAsset {
        keyword: String,
        candidates_tried: usize,
    },
}

impl MediaOutcome {
    pub fn asset(&self) -> Option<&AcquiredAsset> {
        match self {
            Self::Asset(asset) => Some(asset),
            Self::NoAsset { .. } => None,
        }
    }
}

/// Accepted image formats, detected from payload magic numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Why a downloaded payload was rejected by the quality gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    TooSmall(usize),
    BadSignature,
}

// ---------------------------------------------------------------------------
// MediaFetcher
// ---------------------------------------------------------------------------

/// Downloads and validates image candidates with tiered search fallback.
pub struct MediaFetcher {
    client: reqwest::Client,
    min_bytes: u64,
    backup_endpoint: String,
}

impl MediaFetcher {
    /// Create a fetcher with the generic-path defaults.
    pub fn new() -> Result<Self> {
        Self::with_options(DOWNLOAD_TIMEOUT_SECS, DEFAULT_MIN_BYTES)
    }

    /// Create a fetcher with an explicit timeout and minimum payload size.
    pub fn with_options(timeout_secs: u64, min_bytes: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DocweaverError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            min_bytes,
            backup_endpoint: DEFAULT_BACKUP_ENDPOINT.into(),
        })
    }

    /// Point the Tier C scrape at a different surface (tests, mirrors).
    pub fn with_backup_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.backup_endpoint = endpoint.into();
        self
    }

    /// Acquire one validated image for `keyword` into `dest_dir`.
    ///
    /// Runs the tier chain, then downloads candidates in list order until
    /// one passes the quality gate. Unavailable images yield
    /// [`MediaOutcome::NoAsset`]; only filesystem failures are errors.
    #[instrument(skip(self, images))]
    pub async fn acquire(
        &self,
        keyword: &str,
        dest_dir: &Path,
        images: &dyn ImageSearch,
    ) -> Result<MediaOutcome> {
        let candidates = self.collect_candidates(keyword, images).await;

        if candidates.is_empty() {
            info!(keyword, "no image candidates from any tier");
            return Ok(MediaOutcome::NoAsset {
                keyword: keyword.to_string(),
                candidates_tried: 0,
            });
        }

        std::fs::create_dir_all(dest_dir).map_err(|e| DocweaverError::io(dest_dir, e))?;

        for url in &candidates {
            let Some((bytes, kind)) = self.try_download(url).await else {
                continue;
            };

            // UUIDv7: millisecond timestamp prefix + random suffix.
            let filename = format!("{}.{}", Uuid::now_v7(), kind.extension());
            let local_path = dest_dir.join(&filename);
            let byte_size = bytes.len() as u64;

            std::fs::write(&local_path, &bytes)
                .map_err(|e| DocweaverError::io(&local_path, e))?;

            info!(keyword, path = %local_path.display(), byte_size, "image acquired");
            return Ok(MediaOutcome::Asset(AcquiredAsset {
                local_path,
                source_keyword: keyword.to_string(),
                byte_size,
            }));
        }

        info!(
            keyword,
            candidates_tried = candidates.len(),
            "every candidate failed validation"
        );
        Ok(MediaOutcome::NoAsset {
            keyword: keyword.to_string(),
            candidates_tried: candidates.len(),
        })
    }

    /// Run the tier chain until one tier yields candidates.
    ///
    /// A collaborator failure counts as an empty tier: the chain falls
    /// through rather than propagating the error.
    async fn collect_candidates(&self, keyword: &str, images: &dyn ImageSearch) -> Vec<String> {
        // Tier A: high quality, large wide-layout results.
        match images
            .search_images(keyword, ImageSize::Large, Some(ImageLayout::Wide), TIER_A_MAX_CANDIDATES)
            .await
        {
            Ok(urls) if !urls.is_empty() => {
                debug!(keyword, count = urls.len(), "tier A candidates");
                return urls;
            }
            Ok(_) => debug!(keyword, "tier A empty, degrading"),
            Err(e) => warn!(keyword, error = %e, "tier A failed, degrading"),
        }

        // Tier B: degraded, medium size with no layout constraint.
        match images
            .search_images(keyword, ImageSize::Medium, None, TIER_A_MAX_CANDIDATES)
            .await
        {
            Ok(urls) if !urls.is_empty() => {
                debug!(keyword, count = urls.len(), "tier B candidates");
                return urls;
            }
            Ok(_) => debug!(keyword, "tier B empty, falling back to backup crawler"),
            Err(e) => warn!(keyword, error = %e, "tier B failed, falling back to backup crawler"),
        }

        // Tier C: backup crawler.
        match self.backup_scrape(keyword).await {
            Ok(urls) => {
                debug!(keyword, count = urls.len(), "tier C candidates");
                urls
            }
            Err(e) => {
                warn!(keyword, error = %e, "backup crawler failed");
                Vec::new()
            }
        }
    }

    /// Scrape the backup image-search surface for `<img>` sources.
    async fn backup_scrape(&self, keyword: &str) -> Result<Vec<String>> {
        let search_url = format!("{}/images/search", self.backup_endpoint);
        let response = self
            .client
            .get(&search_url)
            .query(&[("q", keyword), ("first", "1")])
            .send()
            .await
            .map_err(|e| DocweaverError::Search(format!("backup search: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocweaverError::Search(format!(
                "backup search: HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DocweaverError::Search(format!("backup search body: {e}")))?;

        Ok(parse_backup_images(&body))
    }

    /// Download one candidate and run the quality gate.
    ///
    /// Network failures and gate rejections both skip to the next
    /// candidate; only the reason differs in the logs.
    async fn try_download(&self, url: &str) -> Option<(Vec<u8>, ImageKind)> {
        let mut request = self.client.get(url);
        if let Some(referer) = origin_referer(url) {
            request = request.header(reqwest::header::REFERER, referer);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(url, error = %e, "candidate fetch failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!(url, %status, "candidate rejected: bad status");
            return None;
        }

        let bytes = match response.bytes().await {
            Ok(b) => b.to_vec(),
            Err(e) => {
                debug!(url, error = %e, "candidate body read failed");
                return None;
            }
        };

        match validate_payload(&bytes, self.min_bytes) {
            Ok(kind) => Some((bytes, kind)),
            Err(Rejection::TooSmall(size)) => {
                debug!(url, size, min = self.min_bytes, "candidate rejected: too small");
                None
            }
            Err(Rejection::BadSignature) => {
                debug!(url, "candidate rejected: not a JPEG/PNG payload");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Quality gate and helpers
// ---------------------------------------------------------------------------

/// The combined minimum-size + magic-number check.
fn validate_payload(bytes: &[u8], min_bytes: u64) -> std::result::Result<ImageKind, Rejection> {
    if (bytes.len() as u64) < min_bytes {
        return Err(Rejection::TooSmall(bytes.len()));
    }

    if bytes.starts_with(&[0xFF, 0xD8]) {
        Ok(ImageKind::Jpeg)
    } else if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        Ok(ImageKind::Png)
    } else {
        Err(Rejection::BadSignature)
    }
}

/// Derive the `Referer` header from the candidate URL's own origin.
fn origin_referer(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let origin = parsed.origin().ascii_serialization();
    if origin == "null" { None } else { Some(origin) }
}

/// Extract `<img>` sources from the backup surface, http(s) only,
/// first-seen order preserved, capped at [`BACKUP_MAX_CANDIDATES`].
fn parse_backup_images(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let img_sel = Selector::parse("img").unwrap();

    let mut seen: HashSet<String> = HashSet::new();
    let mut urls = Vec::new();

    for element in doc.select(&img_sel) {
        let Some(src) = element
            .value()
            .attr("src")
            .or_else(|| element.value().attr("data-src"))
        else {
            continue;
        };

        if !src.starts_with("http") {
            continue;
        }

        if seen.insert(src.to_string()) {
            urls.push(src.to_string());
        }

        if urls.len() == BACKUP_MAX_CANDIDATES {
            break;
        }
    }

    urls
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
