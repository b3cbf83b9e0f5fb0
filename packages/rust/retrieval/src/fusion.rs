//! Context Fusion Engine.
//!
//! Merges local-store retrieval and web search into one bounded
//! [`ContextBundle`] per section. The two web queries run concurrently but
//! their results are merged in fixed query order, so URL dedup never
//! depends on arrival timing. A failed collaborator call contributes an
//! empty list; the bundle is always produced from whatever succeeded.

use tracing::{instrument, warn};

use docweaver_search::TextSearch;
use docweaver_shared::{ContextBundle, LocalSnippet, OutlineSection, WebSnippet};

use crate::store::KnowledgeStore;

/// Snippets requested from the local store per section.
pub const LOCAL_TOP_K: usize = 2;

/// Web results requested per synthesized query.
pub const WEB_RESULTS_PER_QUERY: usize = 2;

/// Build the context bundle for one section.
///
/// 1. One composite local query (`topic + title + description`), top-k
///    [`LOCAL_TOP_K`].
/// 2. One web search per synthesized query, [`WEB_RESULTS_PER_QUERY`]
///    results each, merged in query order and deduplicated by URL
///    (first occurrence wins), hard-capped by the bundle constructor.
/// 3. Local tier renders first, web tier second; both empty renders the
///    explicit no-reference placeholder.
#[instrument(skip_all, fields(section = %section.title, queries = queries.len()))]
pub async fn fuse(
    topic: &str,
    section: &OutlineSection,
    queries: &[String],
    store: &dyn KnowledgeStore,
    web: &dyn TextSearch,
) -> ContextBundle {
    let composite = format!("{topic} {} {}", section.title, section.description);

    let local: Vec<LocalSnippet> = match store.query(&composite, LOCAL_TOP_K).await {
        Ok(snippets) => snippets
            .into_iter()
            .map(|text| LocalSnippet { text })
            .collect(),
        Err(e) => {
            warn!(error = %e, "local store query failed, continuing without local tier");
            Vec::new()
        }
    };

    let web_results = run_web_queries(queries, web).await;

    ContextBundle::new(local, web_results)
}

/// Issue the web queries concurrently, then flatten in fixed query order.
async fn run_web_queries(queries: &[String], web: &dyn TextSearch) -> Vec<WebSnippet> {
    match queries {
        [] => Vec::new(),
        [only] => run_one(only, web).await,
        [first, second, ..] => {
            let (a, b) = tokio::join!(run_one(first, web), run_one(second, web));
            let mut merged = a;
            merged.extend(b);
            merged
        }
    }
}

/// One web query; a failure is absorbed as an empty contribution.
async fn run_one(query: &str, web: &dyn TextSearch) -> Vec<WebSnippet> {
    match web.search_text(query, WEB_RESULTS_PER_QUERY).await {
        Ok(results) => results,
        Err(e) => {
            warn!(query, error = %e, "web search failed, continuing without its results");
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
