//! Query Synthesizer.
//!
//! Derives at most [`MAX_QUERIES`] web search queries for one section via
//! the completion collaborator. Never returns an empty list: when parsing
//! yields nothing (including a failed completion), exactly one fallback
//! query of `topic + title` is synthesized.

use tracing::{debug, instrument};

use docweaver_shared::OutlineSection;

use crate::completion::{CompletionClient, CompletionMode, complete_or_empty};
use crate::prompts;

/// Queries retained per section.
pub const MAX_QUERIES: usize = 2;

/// Synthesize the search queries for one section.
#[instrument(skip(client, section), fields(section = %section.title))]
pub async fn synthesize_queries(
    client: &dyn CompletionClient,
    model: &str,
    topic: &str,
    section: &OutlineSection,
) -> Vec<String> {
    let prompt = prompts::queries_prompt(topic, section);
    let response = complete_or_empty(client, &prompt, model, CompletionMode::Text).await;

    let queries = parse_queries(&response, topic, &section.title);
    debug!(?queries, "queries synthesized");
    queries
}

/// Split a comma-separated response into queries, trimmed, empties dropped,
/// capped at [`MAX_QUERIES`]; guaranteed non-empty via the fallback.
pub fn parse_queries(response: &str, topic: &str, title: &str) -> Vec<String> {
    let queries: Vec<String> = response
        .split(',')
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .take(MAX_QUERIES)
        .map(String::from)
        .collect();

    if queries.is_empty() {
        vec![format!("{topic} {title}")]
    } else {
        queries
    }
}
