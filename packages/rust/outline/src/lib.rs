//! Outline normalization for planner responses.
//!
//! Planner models are asked for a JSON array of `{title, description}`
//! objects but routinely return something else: the array wrapped in a named
//! field, a map keyed by `"0"`, `"1"`, …, markdown-fenced JSON, or
//! concatenated objects with no wrapping punctuation. The normalizer turns
//! all of those into one canonical, ordered section list — or an empty list
//! when nothing can be recovered, which callers treat as "cannot proceed"
//! rather than a crash.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use docweaver_shared::OutlineSection;

// ---------------------------------------------------------------------------
// Raw shape classification
// ---------------------------------------------------------------------------

/// The shapes a planner response is known to arrive in.
///
/// Resolved by the ordered rule chain in [`normalize_outline`]; never assume
/// any single shape.
#[derive(Debug)]
enum RawOutline {
    /// A JSON array of section-shaped objects. Used directly.
    Array(Vec<Value>),
    /// A map wrapping the section array under a named field.
    WrappedArray(Vec<Value>),
    /// A map keyed by integer-like strings (`"0"`, `"1"`, …).
    IndexedMap(Vec<Value>),
    /// Not parseable as JSON at all.
    Unparsable,
}

/// Matches a standalone `{"title": ..., "description": ...}` fragment, for
/// recovering sections from concatenated objects the planner emitted without
/// wrapping punctuation.
static FRAGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\{\s*"title"\s*:\s*".*?"\s*,\s*"description"\s*:\s*".*?"\s*\}"#)
        .expect("fragment regex")
});

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Normalize a raw planner response into an ordered section list.
///
/// Rules applied in order, first match wins:
/// 1. JSON array → used directly, order preserved.
/// 2. Keyed map → first value that is itself an array.
/// 3. Map with integer-like keys → values collected in numeric key order.
/// 4. Unparsable text → independent parse of each
///    `{"title": ..., "description": ...}` fragment.
/// 5. Everything failed → empty vec (recoverable, reportable).
///
/// Deterministic and idempotent: feeding a canonical section list back
/// through yields an identical list. Missing titles become `"Section N"`.
pub fn normalize_outline(raw: &str) -> Vec<OutlineSection> {
    let cleaned = strip_code_fences(raw);

    let values = match classify(&cleaned) {
        RawOutline::Array(items) => items,
        RawOutline::WrappedArray(items) => items,
        RawOutline::IndexedMap(items) => items,
        RawOutline::Unparsable => Vec::new(),
    };

    let mut sections = collect_sections(&values);

    // Last resort: extract section fragments straight from the text.
    if sections.is_empty() {
        let fragments = extract_fragments(&cleaned);
        sections = collect_sections(&fragments);
        if !sections.is_empty() {
            debug!(
                count = sections.len(),
                "outline recovered via fragment extraction"
            );
        }
    }

    if sections.is_empty() {
        warn!("planner response yielded no usable outline sections");
    }

    sections
}

// ---------------------------------------------------------------------------
// Rule chain
// ---------------------------------------------------------------------------

/// Parse the cleaned text and classify its shape.
fn classify(cleaned: &str) -> RawOutline {
    let parsed: Value = match serde_json::from_str(cleaned) {
        Ok(v) => v,
        Err(_) => return RawOutline::Unparsable,
    };

    match parsed {
        Value::Array(items) => RawOutline::Array(items),
        Value::Object(map) => {
            // Rule 2: the planner wrapped the list in a named field.
            for (_key, value) in &map {
                if let Value::Array(items) = value {
                    return RawOutline::WrappedArray(items.clone());
                }
            }

            // Rule 3: integer-like keys, sorted numerically.
            let mut indexed: Vec<(u64, Value)> = map
                .iter()
                .filter_map(|(key, value)| {
                    key.parse::<u64>().ok().map(|idx| (idx, value.clone()))
                })
                .collect();

            if indexed.is_empty() {
                return RawOutline::Unparsable;
            }

            indexed.sort_by_key(|(idx, _)| *idx);
            RawOutline::IndexedMap(indexed.into_iter().map(|(_, v)| v).collect())
        }
        _ => RawOutline::Unparsable,
    }
}

/// Convert section-shaped values into [`OutlineSection`]s, skipping anything
/// that is not an object. `order` is positional among the kept values.
fn collect_sections(values: &[Value]) -> Vec<OutlineSection> {
    values
        .iter()
        .filter(|v| v.is_object())
        .enumerate()
        .map(|(order, value)| section_from_value(value, order))
        .collect()
}

/// Build one section, synthesizing a placeholder title when missing.
fn section_from_value(value: &Value, order: usize) -> OutlineSection {
    let title = value
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("Section {}", order + 1));

    let description = value
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("")
        .to_string();

    OutlineSection {
        title,
        description,
        order,
    }
}

/// Extract independently-parseable section fragments from raw text.
fn extract_fragments(text: &str) -> Vec<Value> {
    FRAGMENT_RE
        .find_iter(text)
        .filter_map(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .collect()
}

/// Remove markdown code fences the model wrapped its JSON in.
fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn two_section_outline() -> Vec<OutlineSection> {
        vec![
            OutlineSection {
                title: "Risks".into(),
                description: "radiation".into(),
                order: 0,
            },
            OutlineSection {
                title: "Timeline".into(),
                description: "2050 plan".into(),
                order: 1,
            },
        ]
    }

    #[test]
    fn plain_array_used_directly() {
        let raw = r#"[
            {"title": "Risks", "description": "radiation"},
            {"title": "Timeline", "description": "2050 plan"}
        ]"#;
        assert_eq!(normalize_outline(raw), two_section_outline());
    }

    #[test]
    fn wrapped_array_unwrapped() {
        let raw = r#"{"chapters": [
            {"title": "Risks", "description": "radiation"},
            {"title": "Timeline", "description": "2050 plan"}
        ]}"#;
        assert_eq!(normalize_outline(raw), two_section_outline());
    }

    #[test]
    fn integer_keyed_map_sorted_numerically() {
        let raw = r#"{
            "1": {"title": "Timeline", "description": "2050 plan"},
            "0": {"title": "Risks", "description": "radiation"}
        }"#;
        assert_eq!(normalize_outline(raw), two_section_outline());
    }

    #[test]
    fn integer_keys_sort_numerically_not_lexically() {
        let raw = r#"{
            "10": {"title": "Last", "description": ""},
            "2": {"title": "Second", "description": ""},
            "1": {"title": "First", "description": ""}
        }"#;
        let sections = normalize_outline(raw);
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Last"]);
    }

    #[test]
    fn concatenated_fragments_recovered() {
        let raw = r#"Here is the outline:
            {"title": "Risks", "description": "radiation"}
            {"title": "Timeline", "description": "2050 plan"}"#;
        assert_eq!(normalize_outline(raw), two_section_outline());
    }

    #[test]
    fn code_fences_stripped() {
        let raw = "```json\n[{\"title\": \"Risks\", \"description\": \"radiation\"}, {\"title\": \"Timeline\", \"description\": \"2050 plan\"}]\n```";
        assert_eq!(normalize_outline(raw), two_section_outline());
    }

    #[test]
    fn unrecoverable_input_yields_empty() {
        assert!(normalize_outline("the planner had a bad day").is_empty());
        assert!(normalize_outline("").is_empty());
        assert!(normalize_outline("42").is_empty());
    }

    #[test]
    fn missing_title_gets_placeholder() {
        let raw = r#"[{"description": "no title here"}, {"title": "Named", "description": ""}]"#;
        let sections = normalize_outline(raw);
        assert_eq!(sections[0].title, "Section 1");
        assert_eq!(sections[1].title, "Named");
    }

    #[test]
    fn non_object_items_skipped() {
        let raw = r#"[{"title": "Keep", "description": "d"}, "stray string", 7]"#;
        let sections = normalize_outline(raw);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Keep");
        assert_eq!(sections[0].order, 0);
    }

    #[test]
    fn normalization_is_idempotent() {
        let canonical = two_section_outline();
        let json = serde_json::to_string(&canonical).expect("serialize");
        assert_eq!(normalize_outline(&json), canonical);
    }

    #[test]
    fn mars_colonization_scenario() {
        let raw = r#"{"0": {"title": "Risks", "description": "radiation"},
                      "1": {"title": "Timeline", "description": "2050 plan"}}"#;
        let sections = normalize_outline(raw);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Risks");
        assert_eq!(sections[0].order, 0);
        assert_eq!(sections[1].title, "Timeline");
        assert_eq!(sections[1].order, 1);
    }
}
