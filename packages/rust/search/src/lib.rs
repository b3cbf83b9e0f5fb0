//! Web search collaborator contracts and the default DuckDuckGo client.
//!
//! The fusion and media engines consume the [`TextSearch`] and
//! [`ImageSearch`] traits; [`DuckDuckGo`] is the default implementation,
//! backed by the HTML search endpoint for text and the `i.js` JSON endpoint
//! for images.

mod duckduckgo;

use async_trait::async_trait;

use docweaver_shared::{Result, WebSnippet};

pub use duckduckgo::DuckDuckGo;

// ---------------------------------------------------------------------------
// Hints
// ---------------------------------------------------------------------------

/// Image size hint passed to the image-search surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Small,
    Medium,
    Large,
    Wallpaper,
}

impl ImageSize {
    /// The filter token understood by the search surface.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Large => "Large",
            Self::Wallpaper => "Wallpaper",
        }
    }
}

/// Image layout hint passed to the image-search surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayout {
    Square,
    Tall,
    Wide,
}

impl ImageLayout {
    /// The filter token understood by the search surface.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Square => "Square",
            Self::Tall => "Tall",
            Self::Wide => "Wide",
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Text web-search collaborator.
#[async_trait]
pub trait TextSearch: Send + Sync {
    /// Search the web for `keyword`, returning at most `max_results`
    /// snippets in result order.
    async fn search_text(&self, keyword: &str, max_results: usize) -> Result<Vec<WebSnippet>>;
}

/// Image web-search collaborator.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    /// Search for direct image URLs matching `keyword`, constrained by the
    /// given size and optional layout hints.
    async fn search_images(
        &self,
        keyword: &str,
        size: ImageSize,
        layout: Option<ImageLayout>,
        max_results: usize,
    ) -> Result<Vec<String>>;
}
