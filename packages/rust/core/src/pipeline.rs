//! End-to-end document pipeline: topic → outline → per-section context
//! fusion, prose, media → rendered markdown.
//!
//! Sections run strictly sequentially; every per-section collaborator
//! failure degrades locally (empty queries, empty bundle, no asset), and
//! only two things abort a run: an unrecoverable outline and a filesystem
//! failure.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use docweaver_media::{MediaFetcher, MediaOutcome};
use docweaver_outline::normalize_outline;
use docweaver_retrieval::{KnowledgeStore, fuse};
use docweaver_search::{ImageSearch, TextSearch};
use docweaver_shared::{DocweaverError, Result, RunContext};

use crate::assembler::{Document, assemble_section};
use crate::completion::{CompletionClient, CompletionMode, complete_or_empty};
use crate::prompts;
use crate::queries::synthesize_queries;

/// Configuration for one `write_document` run.
#[derive(Debug, Clone)]
pub struct WriteConfig {
    /// Subject of the document.
    pub topic: String,
    /// Root directory for this run's artifacts.
    pub output_root: PathBuf,
    /// Model used for outline planning and query synthesis.
    pub planner_model: String,
    /// Model used for section prose.
    pub writer_model: String,
    /// Model used for illustration keyword extraction.
    pub visualizer_model: String,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct WriteResult {
    /// Path of the rendered markdown document.
    pub document_path: PathBuf,
    /// Number of sections written.
    pub section_count: usize,
    /// Number of sections that received an illustration.
    pub assets_acquired: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a section's work begins.
    fn section_started(&self, title: &str, current: usize, total: usize);
    /// Called when a section has been assembled.
    fn section_completed(&self, title: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &WriteResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn section_started(&self, _title: &str, _current: usize, _total: usize) {}
    fn section_completed(&self, _title: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &WriteResult) {}
}

/// Run the full document pipeline.
///
/// 1. Plan the outline (completion, JSON-biased) and normalize it
/// 2. Per section: synthesize queries → fuse context → write prose →
///    extract keyword → acquire media → assemble
/// 3. Render and write `document.md`
#[instrument(skip_all, fields(topic = %config.topic))]
pub async fn write_document(
    config: &WriteConfig,
    completion: &dyn CompletionClient,
    store: &dyn KnowledgeStore,
    web: &dyn TextSearch,
    images: &dyn ImageSearch,
    media: &MediaFetcher,
    progress: &dyn ProgressReporter,
) -> Result<WriteResult> {
    let start = Instant::now();
    let ctx = RunContext::new(config.topic.clone(), config.output_root.clone());

    std::fs::create_dir_all(&ctx.output_root)
        .map_err(|e| DocweaverError::io(&ctx.output_root, e))?;

    // --- Phase 1: Outline ---
    progress.phase("Planning outline");
    let planner_response = complete_or_empty(
        completion,
        &prompts::outline_prompt(&ctx.topic),
        &config.planner_model,
        CompletionMode::Json,
    )
    .await;

    let sections = normalize_outline(&planner_response);
    if sections.is_empty() {
        return Err(DocweaverError::validation(
            "planner produced no usable outline sections; cannot proceed",
        ));
    }

    info!(sections = sections.len(), "outline planned");

    // --- Phase 2: Write each section ---
    let total = sections.len();
    let mut document = Document::new(ctx.topic.clone());

    for (i, section) in sections.iter().enumerate() {
        progress.section_started(&section.title, i + 1, total);

        let queries =
            synthesize_queries(completion, &config.planner_model, &ctx.topic, section).await;

        let bundle = fuse(&ctx.topic, section, &queries, store, web).await;

        let prose = complete_or_empty(
            completion,
            &prompts::section_prompt(&ctx.topic, section, &bundle.render()),
            &config.writer_model,
            CompletionMode::Text,
        )
        .await;
        if prose.is_empty() {
            warn!(section = %section.title, "writer returned no prose for section");
        }

        let outcome = acquire_illustration(
            completion,
            &config.visualizer_model,
            &prose,
            &ctx,
            images,
            media,
        )
        .await?;

        let result = assemble_section(section, &prose, bundle, queries, outcome, &ctx);
        document.push(result);

        progress.section_completed(&section.title, i + 1, total);
    }

    // --- Phase 3: Render ---
    progress.phase("Rendering document");
    let document_path = ctx.output_root.join("document.md");
    document.write_to(&document_path)?;

    let assets_acquired = document
        .sections()
        .iter()
        .filter(|s| s.asset.is_some())
        .count();

    let result = WriteResult {
        document_path,
        section_count: document.sections().len(),
        assets_acquired,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        sections = result.section_count,
        assets = result.assets_acquired,
        elapsed_ms = result.elapsed.as_millis(),
        "document pipeline complete"
    );

    Ok(result)
}

/// Extract an illustration keyword from the prose and run media
/// acquisition. An unusable keyword short-circuits to `NoAsset`; only a
/// persistence failure propagates.
async fn acquire_illustration(
    completion: &dyn CompletionClient,
    visualizer_model: &str,
    prose: &str,
    ctx: &RunContext,
    images: &dyn ImageSearch,
    media: &MediaFetcher,
) -> Result<MediaOutcome> {
    let raw = complete_or_empty(
        completion,
        &prompts::keyword_prompt(prose),
        visualizer_model,
        CompletionMode::Text,
    )
    .await;

    let keyword = prompts::sanitize_keyword(&raw);
    if keyword.is_empty() {
        warn!("no illustration keyword extracted, skipping media acquisition");
        return Ok(MediaOutcome::NoAsset {
            keyword,
            candidates_tried: 0,
        });
    }

    media.acquire(&keyword, &ctx.assets_dir, images).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;

    use docweaver_shared::WebSnippet;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Routes completions by mode and prompt markers.
    struct FakeCompletion {
        outline: String,
    }

    #[async_trait]
    impl CompletionClient for FakeCompletion {
        async fn complete(
            &self,
            prompt: &str,
            _model: &str,
            mode: CompletionMode,
        ) -> docweaver_shared::Result<String> {
            if mode == CompletionMode::Json {
                return Ok(self.outline.clone());
            }
            if prompt.contains("web search queries") {
                return Ok("mars latest news, radiation data".into());
            }
            if prompt.contains("search keyword") {
                return Ok("mars surface".into());
            }
            Ok("Grounded prose about the section.".into())
        }
    }

    struct EmptyStore;

    #[async_trait]
    impl KnowledgeStore for EmptyStore {
        async fn query(
            &self,
            _query: &str,
            _top_k: usize,
        ) -> docweaver_shared::Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn ingest_dir(&mut self, _dir: &Path) -> docweaver_shared::Result<()> {
            Ok(())
        }
    }

    struct FakeWeb;

    #[async_trait]
    impl TextSearch for FakeWeb {
        async fn search_text(
            &self,
            keyword: &str,
            _max_results: usize,
        ) -> docweaver_shared::Result<Vec<WebSnippet>> {
            Ok(vec![WebSnippet {
                title: format!("result for {keyword}"),
                url: format!("https://example.com/{}", keyword.replace(' ', "-")),
                summary: "summary".into(),
            }])
        }
    }

    struct NoImages;

    #[async_trait]
    impl ImageSearch for NoImages {
        async fn search_images(
            &self,
            _keyword: &str,
            _size: docweaver_search::ImageSize,
            _layout: Option<docweaver_search::ImageLayout>,
            _max_results: usize,
        ) -> docweaver_shared::Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn config(output_root: &Path) -> WriteConfig {
        WriteConfig {
            topic: "Mars colonization".into(),
            output_root: output_root.into(),
            planner_model: "planner".into(),
            writer_model: "writer".into(),
            visualizer_model: "visualizer".into(),
        }
    }

    async fn blank_backup_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;
        server
    }

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("dw-pipeline-test-{}", uuid::Uuid::now_v7()))
    }

    #[tokio::test]
    async fn full_run_writes_ordered_document() {
        let root = temp_root();
        let server = blank_backup_server().await;

        let completion = FakeCompletion {
            outline: r#"{"0": {"title": "Risks", "description": "radiation"},
                         "1": {"title": "Timeline", "description": "2050 plan"}}"#
                .into(),
        };
        let media = MediaFetcher::with_options(5, 50 * 1024)
            .unwrap()
            .with_backup_endpoint(server.uri());

        let result = write_document(
            &config(&root),
            &completion,
            &EmptyStore,
            &FakeWeb,
            &NoImages,
            &media,
            &SilentProgress,
        )
        .await
        .unwrap();

        assert_eq!(result.section_count, 2);
        assert_eq!(result.assets_acquired, 0);

        let markdown = std::fs::read_to_string(&result.document_path).unwrap();
        assert!(markdown.starts_with("# Mars colonization\n\n"));
        let risks = markdown.find("## Risks").unwrap();
        let timeline = markdown.find("## Timeline").unwrap();
        assert!(risks < timeline);
        assert!(markdown.contains("illustration unavailable"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn unrecoverable_outline_aborts_with_validation_error() {
        let root = temp_root();
        let server = blank_backup_server().await;

        let completion = FakeCompletion {
            outline: "the model refused to cooperate".into(),
        };
        let media = MediaFetcher::with_options(5, 50 * 1024)
            .unwrap()
            .with_backup_endpoint(server.uri());

        let err = write_document(
            &config(&root),
            &completion,
            &EmptyStore,
            &FakeWeb,
            &NoImages,
            &media,
            &SilentProgress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DocweaverError::Validation { .. }));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn acquires_asset_when_image_candidates_validate() {
        let root = temp_root();
        let server = blank_backup_server().await;

        let mut payload = vec![0u8; 80 * 1024];
        payload[..4].copy_from_slice(&[0x89, 0x50, 0x4E, 0x47]);
        Mock::given(method("GET"))
            .and(path("/mars.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(payload))
            .mount(&server)
            .await;

        struct OneImage {
            url: String,
        }

        #[async_trait]
        impl ImageSearch for OneImage {
            async fn search_images(
                &self,
                _keyword: &str,
                _size: docweaver_search::ImageSize,
                _layout: Option<docweaver_search::ImageLayout>,
                _max_results: usize,
            ) -> docweaver_shared::Result<Vec<String>> {
                Ok(vec![self.url.clone()])
            }
        }

        let completion = FakeCompletion {
            outline: r#"[{"title": "Risks", "description": "radiation"}]"#.into(),
        };
        let media = MediaFetcher::with_options(5, 50 * 1024)
            .unwrap()
            .with_backup_endpoint(server.uri());
        let images = OneImage {
            url: format!("{}/mars.png", server.uri()),
        };

        let result = write_document(
            &config(&root),
            &completion,
            &EmptyStore,
            &FakeWeb,
            &images,
            &media,
            &SilentProgress,
        )
        .await
        .unwrap();

        assert_eq!(result.assets_acquired, 1);

        let markdown = std::fs::read_to_string(&result.document_path).unwrap();
        assert!(markdown.contains("![mars surface](assets/"));
        // Forward slashes only in the embedded reference.
        assert!(!markdown.contains("](assets\\"));

        let _ = std::fs::remove_dir_all(&root);
    }
}
