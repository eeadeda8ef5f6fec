//! Structured-response extraction from free-form model output.
//!
//! Agents and judges are asked for JSON but reply however they like: bare
//! JSON, JSON inside a fenced code block, or JSON buried in prose. Extraction
//! is an explicit ordered list of strategies, tried in order, first success
//! wins. Each strategy swallows malformed input and falls through, so a
//! failure never escapes this module; callers get `None` when nothing in the
//! text parses.
//!
//! The same chain is used for the agent's final answer and for every judge
//! reply. It assumes nothing about the payload beyond "valid JSON object".

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static TAGGED_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("valid regex"));

static ANY_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```\s*(.*?)\s*```").expect("valid regex"));

static BRACE_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

/// One step of the extraction chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Parse the whole text as JSON.
    WholeText,
    /// Parse the body of a ```json fenced block.
    TaggedFence,
    /// Parse the body of any fenced block.
    AnyFence,
    /// Parse the outermost brace-delimited span.
    BraceSpan,
}

impl ParseStrategy {
    /// Apply this strategy to raw text. Returns `None` when the strategy
    /// finds nothing it can parse; never panics on malformed input.
    pub fn apply(&self, raw: &str) -> Option<Value> {
        match self {
            ParseStrategy::WholeText => serde_json::from_str(raw.trim()).ok(),
            ParseStrategy::TaggedFence => first_parsable_capture(&TAGGED_FENCE, raw),
            ParseStrategy::AnyFence => first_parsable_capture(&ANY_FENCE, raw),
            ParseStrategy::BraceSpan => BRACE_SPAN
                .find(raw)
                .and_then(|m| serde_json::from_str(m.as_str()).ok()),
        }
    }
}

/// The full chain, in the order it is tried.
pub const STRATEGIES: &[ParseStrategy] = &[
    ParseStrategy::WholeText,
    ParseStrategy::TaggedFence,
    ParseStrategy::AnyFence,
    ParseStrategy::BraceSpan,
];

fn first_parsable_capture(re: &Regex, raw: &str) -> Option<Value> {
    for caps in re.captures_iter(raw) {
        if let Some(body) = caps.get(1) {
            if let Ok(v) = serde_json::from_str(body.as_str()) {
                return Some(v);
            }
        }
    }
    None
}

/// Extract a JSON value from free-form model output.
///
/// Returns `None` only when every strategy in [`STRATEGIES`] fails.
pub fn extract_structured(raw: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }
    STRATEGIES.iter().find_map(|s| s.apply(raw))
}

// =============================================================================
// Agent answer schema
// =============================================================================

/// One prospect entry from the agent's final answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProspectAnswer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub first_line: String,
    #[serde(default)]
    pub evidence_url: String,
    #[serde(default)]
    pub evidence_quote: String,
}

impl ProspectAnswer {
    /// Blank entry used when the agent produced fewer prospects than expected.
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Pull the `prospects` array out of a parsed agent answer.
///
/// Returns `None` when the field is absent or not an array — structural
/// absence, which callers treat as total failure for the evaluation.
/// Individual entries missing fields deserialize with empty-string defaults.
pub fn parse_agent_answer(value: &Value) -> Option<Vec<ProspectAnswer>> {
    let arr = value.get("prospects")?.as_array()?;
    Some(
        arr.iter()
            .map(|v| serde_json::from_value(v.clone()).unwrap_or_default())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn whole_text_parses_bare_json() {
        let v = extract_structured(r#"{"prospects": []}"#).unwrap();
        assert_eq!(v, json!({"prospects": []}));
    }

    #[test]
    fn tagged_fence_parses() {
        let raw = "Here you go:\n```json\n{\"a\": 1}\n```\nDone.";
        assert_eq!(extract_structured(raw).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn untagged_fence_parses() {
        let raw = "```\n{\"a\": 2}\n```";
        assert_eq!(extract_structured(raw).unwrap(), json!({"a": 2}));
    }

    #[test]
    fn brace_span_parses_json_in_prose() {
        let raw = "My verdict is {\"a\": 3} as discussed above.";
        assert_eq!(extract_structured(raw).unwrap(), json!({"a": 3}));
    }

    #[test]
    fn garbage_yields_none() {
        assert!(extract_structured("no structure here at all").is_none());
        assert!(extract_structured("").is_none());
        assert!(extract_structured("```json\nnot json\n```").is_none());
    }

    #[test]
    fn fenced_equals_direct() {
        // Parsing well-formed JSON must give the same value whether bare
        // or wrapped in a code fence.
        let payload = r#"{"prospects": [{"name": "A", "first_line": "hi"}]}"#;
        let direct = extract_structured(payload).unwrap();
        let fenced = extract_structured(&format!("```json\n{payload}\n```")).unwrap();
        assert_eq!(direct, fenced);
    }

    #[test]
    fn skips_unparsable_fence_then_finds_parsable() {
        let raw = "```\nplain text\n```\n```json\n{\"ok\": true}\n```";
        assert_eq!(extract_structured(raw).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn strategies_independently_testable() {
        let raw = "prefix {\"x\": 1} suffix";
        assert!(ParseStrategy::WholeText.apply(raw).is_none());
        assert!(ParseStrategy::TaggedFence.apply(raw).is_none());
        assert_eq!(ParseStrategy::BraceSpan.apply(raw).unwrap(), json!({"x": 1}));
    }

    #[test]
    fn agent_answer_missing_prospects_is_structural_absence() {
        assert!(parse_agent_answer(&json!({"other": []})).is_none());
        assert!(parse_agent_answer(&json!({"prospects": "nope"})).is_none());
    }

    #[test]
    fn agent_answer_tolerates_missing_fields() {
        let v = json!({"prospects": [{"name": "Matthew Christy"}]});
        let prospects = parse_agent_answer(&v).unwrap();
        assert_eq!(prospects.len(), 1);
        assert_eq!(prospects[0].name, "Matthew Christy");
        assert!(prospects[0].evidence_url.is_empty());
    }
}
