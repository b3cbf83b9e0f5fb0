//! Section Assembler and the accumulated Document.
//!
//! Combines generated prose, the fused context bundle, the queries used,
//! and the media outcome into an immutable [`SectionResult`], and folds
//! section results into the [`Document`] whose rendered markdown is the
//! run's terminal artifact.

use std::path::Path;

use tracing::{debug, info, instrument};

use docweaver_media::MediaOutcome;
use docweaver_shared::{ContextBundle, DocweaverError, OutlineSection, Result, RunContext};

/// One fully assembled section. Immutable after assembly.
#[derive(Debug, Clone)]
pub struct SectionResult {
    /// Section title, copied from the outline.
    pub title: String,
    /// Generated prose body.
    pub prose: String,
    /// The context bundle the prose was grounded on.
    pub bundle: ContextBundle,
    /// Search queries used for the web tier.
    pub queries_used: Vec<String>,
    /// The acquired illustration, if any.
    pub asset: Option<docweaver_media::AcquiredAsset>,
    /// Outline position; drives final document ordering.
    pub order: usize,
    /// Canonical rendered markdown for this section.
    pub rendered_markdown: String,
}

/// Build the [`SectionResult`] for one section.
///
/// The rendered form is a `##` heading, the prose body, an image reference
/// line, and a section separator. The image line embeds the canonical
/// relative path when an asset was acquired, or an explicit
/// "illustration unavailable" marker otherwise.
#[instrument(skip_all, fields(section = %section.title))]
pub fn assemble_section(
    section: &OutlineSection,
    prose: &str,
    bundle: ContextBundle,
    queries_used: Vec<String>,
    media: MediaOutcome,
    ctx: &RunContext,
) -> SectionResult {
    let (image_line, asset) = match media {
        MediaOutcome::Asset(asset) => {
            let rel = ctx.rel_asset_path(&asset.local_path);
            (
                format!("![{}]({rel})", asset.source_keyword),
                Some(asset),
            )
        }
        MediaOutcome::NoAsset {
            keyword,
            candidates_tried,
        } => {
            debug!(
                keyword,
                candidates_tried, "section rendered without illustration"
            );
            let line = if keyword.is_empty() {
                "> *(illustration unavailable)*".to_string()
            } else {
                format!("> *(illustration unavailable: {keyword})*")
            };
            (line, None)
        }
    };

    let rendered_markdown = format!(
        "## {}\n\n{prose}\n\n{image_line}\n\n---\n\n",
        section.title
    );

    SectionResult {
        title: section.title.clone(),
        prose: prose.to_string(),
        bundle,
        queries_used,
        asset,
        order: section.order,
        rendered_markdown,
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The ordered accumulation of section results for one run.
///
/// Append-only; rendering re-sorts by `order`, so sections may arrive in
/// any order without affecting the final document.
#[derive(Debug)]
pub struct Document {
    topic: String,
    sections: Vec<SectionResult>,
}

impl Document {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            sections: Vec::new(),
        }
    }

    pub fn push(&mut self, section: SectionResult) {
        self.sections.push(section);
    }

    pub fn sections(&self) -> &[SectionResult] {
        &self.sections
    }

    /// Cumulative markdown: the document title line followed by every
    /// section rendering in outline order.
    pub fn render_markdown(&self) -> String {
        let mut ordered: Vec<&SectionResult> = self.sections.iter().collect();
        ordered.sort_by_key(|s| s.order);

        let mut markdown = format!("# {}\n\n", self.topic);
        for section in ordered {
            markdown.push_str(&section.rendered_markdown);
        }
        markdown
    }

    /// Write the rendered markdown to `path`. Failure here is an
    /// environment problem, fatal for the run — unlike a missing
    /// illustration.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DocweaverError::io(parent, e))?;
        }

        std::fs::write(path, self.render_markdown())
            .map_err(|e| DocweaverError::io(path, e))?;

        info!(path = %path.display(), sections = self.sections.len(), "document written");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
