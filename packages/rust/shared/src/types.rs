//! Core domain types for the Docweaver assembly pipeline.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Character budget for a local snippet preview inside a bundle or prompt.
pub const SNIPPET_PREVIEW_CHARS: usize = 400;

/// Hard cap on web snippets per bundle, regardless of how many unique URLs
/// the searches returned.
pub const MAX_WEB_SNIPPETS: usize = 4;

/// Rendered in place of context blocks when both retrieval tiers came back
/// empty. Downstream consumers rely on this exact marker as a deterministic
/// signal rather than receiving a silently empty bundle.
pub const NO_REFERENCE_MARKER: &str =
    "(No direct reference material available; write from established domain knowledge.)";

// ---------------------------------------------------------------------------
// OutlineSection
// ---------------------------------------------------------------------------

/// One section descriptor from the normalized outline.
///
/// `order` is positional within the outline and drives the final document
/// ordering. `title` is never empty: the normalizer synthesizes a
/// `"Section N"` placeholder when the planner omitted one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSection {
    /// Display title.
    pub title: String,
    /// Short summary of what the section should cover.
    #[serde(default)]
    pub description: String,
    /// Position within the outline (0-based).
    #[serde(default)]
    pub order: usize,
}

// ---------------------------------------------------------------------------
// Snippets
// ---------------------------------------------------------------------------

/// A text snippet retrieved from the local knowledge store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSnippet {
    pub text: String,
}

/// A web search result. Identity is the `url`: two snippets with the same
/// URL are the same entity, and the earlier occurrence wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSnippet {
    pub title: String,
    pub url: String,
    pub summary: String,
}

// ---------------------------------------------------------------------------
// ContextBundle
// ---------------------------------------------------------------------------

/// The capped, deduplicated, tier-ordered set of retrieved context for one
/// section. Immutable once built.
///
/// Local snippets form the high-priority tier and render first; web
/// snippets form the medium-priority tier and render second. The
/// constructor enforces the bundle invariants: local previews truncated to
/// [`SNIPPET_PREVIEW_CHARS`], web URLs unique (first occurrence wins,
/// insertion order preserved), and the web tier capped at
/// [`MAX_WEB_SNIPPETS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBundle {
    local: Vec<LocalSnippet>,
    web: Vec<WebSnippet>,
}

impl ContextBundle {
    pub fn new(local: Vec<LocalSnippet>, web: Vec<WebSnippet>) -> Self {
        let local = local
            .into_iter()
            .map(|s| LocalSnippet {
                text: truncate_chars(&s.text, SNIPPET_PREVIEW_CHARS),
            })
            .collect();

        let mut seen: HashSet<String> = HashSet::new();
        let mut deduped: Vec<WebSnippet> = Vec::new();
        for snippet in web {
            if seen.insert(snippet.url.clone()) {
                deduped.push(snippet);
            }
            if deduped.len() == MAX_WEB_SNIPPETS {
                break;
            }
        }

        Self {
            local,
            web: deduped,
        }
    }

    pub fn local(&self) -> &[LocalSnippet] {
        &self.local
    }

    pub fn web(&self) -> &[WebSnippet] {
        &self.web
    }

    /// True when both tiers are empty and rendering falls back to the
    /// explicit no-reference placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.local.is_empty() && self.web.is_empty()
    }

    /// Render the bundle as ordered context blocks: local tier first, web
    /// tier second. Never empty — an empty bundle yields exactly one
    /// placeholder block.
    pub fn render_blocks(&self) -> Vec<String> {
        if self.is_placeholder() {
            return vec![NO_REFERENCE_MARKER.to_string()];
        }

        let mut blocks = Vec::new();

        if !self.local.is_empty() {
            blocks.push("Local reference material (priority: high):".to_string());
            for (i, snippet) in self.local.iter().enumerate() {
                blocks.push(format!("[Local-{}] {}...", i + 1, snippet.text));
            }
        }

        if !self.web.is_empty() {
            blocks.push("Web search results (priority: medium):".to_string());
            for snippet in &self.web {
                blocks.push(format!(
                    "Source: [{}]({})\nSummary: {}",
                    snippet.title, snippet.url, snippet.summary
                ));
            }
        }

        blocks
    }

    /// The bundle as a single prompt-ready string.
    pub fn render(&self) -> String {
        self.render_blocks().join("\n\n")
    }
}

/// Truncate to at most `max_chars` characters, respecting char boundaries.
fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

// ---------------------------------------------------------------------------
// RunContext
// ---------------------------------------------------------------------------

/// Explicit per-run context threaded through every pipeline component.
///
/// Holds the topic and the output/asset directories for one
/// document-generation run. Asset markdown references are always expressed
/// relative to `output_root` with forward slashes, fixed at asset-creation
/// time so downstream consumers never have to guess paths.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Subject of the document being generated.
    pub topic: String,
    /// Root directory for this run's artifacts.
    pub output_root: PathBuf,
    /// Directory for downloaded images (`<output_root>/assets`).
    pub assets_dir: PathBuf,
}

impl RunContext {
    pub fn new(topic: impl Into<String>, output_root: impl Into<PathBuf>) -> Self {
        let output_root = output_root.into();
        let assets_dir = output_root.join("assets");
        Self {
            topic: topic.into(),
            output_root,
            assets_dir,
        }
    }

    /// The canonical relative path for an asset, as embedded in markdown:
    /// relative to `output_root`, forward slashes on every platform.
    pub fn rel_asset_path(&self, asset: &Path) -> String {
        let relative = asset.strip_prefix(&self.output_root).unwrap_or(asset);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}
