//! Prompt construction for the planner, writer, and visualizer roles.

use std::sync::LazyLock;

use regex::Regex;

use docweaver_shared::OutlineSection;

/// How much prose the keyword-extraction prompt gets to look at.
const KEYWORD_CONTEXT_CHARS: usize = 300;

/// Strips everything but letters, digits, and spaces from an extracted
/// keyword, so it is safe as a search term and a filename component.
static KEYWORD_SANITIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\s]").expect("keyword sanitize regex"));

/// Outline planning prompt. Asks for a strict JSON array; the normalizer
/// copes with everything the model returns anyway.
pub fn outline_prompt(topic: &str) -> String {
    format!(
        "You are a professional technical editor. Plan the outline of an article \
         on the topic \"{topic}\".\n\n\
         Strict format requirements:\n\
         1. Return a plain JSON array of objects.\n\
         2. Do NOT return a dictionary or an index-keyed object (such as {{\"0\": {{...}}}}).\n\
         3. Do not include markdown fences.\n\n\
         Example of the correct format:\n\
         [\n\
             {{\"title\": \"First chapter title\", \"description\": \"Summary...\"}},\n\
             {{\"title\": \"Second chapter title\", \"description\": \"Summary...\"}}\n\
         ]"
    )
}

/// Query synthesis prompt: one broad term, one precise term.
pub fn queries_prompt(topic: &str, section: &OutlineSection) -> String {
    format!(
        "Turn this section into 2 web search queries.\n\
         Topic: {topic}\n\
         Section: {} ({})\n\n\
         Requirements:\n\
         1. One broad query (for example: \"{topic} latest news\")\n\
         2. One precise query (for example: \"{} data analysis\")\n\
         3. Return only the queries, comma-separated, with no explanation.",
        section.title, section.description, section.title
    )
}

/// Grounded section-writing prompt.
pub fn section_prompt(topic: &str, section: &OutlineSection, context: &str) -> String {
    format!(
        "You are a rigorous technical writer. Write an article section based on \
         the reference material.\n\
         Article topic: {topic}\n\
         Section title: {}\n\
         Section summary: {}\n\
         Reference material:\n\
         {context}\n\n\
         Key requirements:\n\
         1. Ground the content in the reference material above whenever possible.\n\
         2. Never cite links unrelated to this section.\n\
         3. When you use a fact from the web results, append a markdown link \
            citation: `...statement [source title](URL)`.\n\
         4. Analyse and synthesise; do not just enumerate.\n\
         5. Length: 400-600 words.",
        section.title, section.description
    )
}

/// Illustration keyword extraction prompt over a prose preview.
pub fn keyword_prompt(prose: &str) -> String {
    let preview = truncate_chars(prose, KEYWORD_CONTEXT_CHARS);
    format!(
        "Read the following text and extract the single best English search \
         keyword for an illustrative image.\n\
         Text: {preview}...\n\
         Return only the keyword, in English, with no explanation."
    )
}

/// Sanitize the visualizer's keyword answer into a plain search term.
/// Returns an empty string when nothing survives.
pub fn sanitize_keyword(raw: &str) -> String {
    KEYWORD_SANITIZE_RE
        .replace_all(raw, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
