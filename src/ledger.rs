//! Tool-usage reconstruction from an agent transcript.
//!
//! The agent runs with two tools: a web search and a URL content extractor.
//! The scorer never sees what those tools returned; it only needs the fact
//! that an invocation happened and its argument. Tool calls are decoded once
//! at ingest time into tagged [`ToolInvocation`]s, and downstream code
//! matches on the tag only — no ad-hoc attribute sniffing.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool name the agent uses to issue web searches.
pub const SEARCH_TOOL: &str = "tavily_search";
/// Tool name the agent uses to extract page content from a URL.
pub const EXTRACT_TOOL: &str = "tavily_extract";

// =============================================================================
// Transcript types
// =============================================================================

/// A single tool call as recorded in the transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    /// Argument mapping as the agent runtime recorded it.
    #[serde(default)]
    pub arguments: serde_json::Map<String, Value>,
}

/// One message of the agent conversation, as handed over by the runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

// =============================================================================
// Invocations
// =============================================================================

/// Kind of tool invocation we care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolKind {
    Search,
    Extract,
}

/// A decoded tool invocation, immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub kind: ToolKind,
    /// Search query or URL, depending on `kind`.
    pub argument: String,
    /// Position in transcript order, for auditability.
    pub issued_at: usize,
}

/// Decode recognized tool calls from a transcript, in order.
///
/// Unknown tool names are skipped (forward-compatible with new tools), as
/// are invocations whose argument is missing or empty — they cannot verify
/// anything.
pub fn decode_invocations(messages: &[TranscriptMessage]) -> Vec<ToolInvocation> {
    let mut out = Vec::new();
    let mut ordinal = 0usize;

    for message in messages {
        for call in &message.tool_calls {
            let decoded = match call.name.as_str() {
                SEARCH_TOOL => string_arg(&call.arguments, "query").map(|q| (ToolKind::Search, q)),
                EXTRACT_TOOL => string_arg(&call.arguments, "url").map(|u| (ToolKind::Extract, u)),
                _ => None,
            };
            if let Some((kind, argument)) = decoded {
                out.push(ToolInvocation {
                    kind,
                    argument,
                    issued_at: ordinal,
                });
            }
            ordinal += 1;
        }
    }

    out
}

fn string_arg(args: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    let s = args.get(key)?.as_str()?;
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Normalized record of everything the agent searched and fetched.
///
/// Built once per evaluation; read-only thereafter. `visited` is a derived
/// view of `extracted` (lower-cased, trimmed) and is never mutated
/// separately.
#[derive(Debug, Clone, Default)]
pub struct ToolUsageLedger {
    /// Search queries, transcript order.
    pub searches: Vec<String>,
    /// Extracted URLs, transcript order.
    pub extracted: Vec<String>,
    /// Normalized extracted URLs for membership checks.
    pub visited: HashSet<String>,
}

impl ToolUsageLedger {
    pub fn from_invocations(invocations: &[ToolInvocation]) -> Self {
        let mut ledger = Self::default();
        for inv in invocations {
            match inv.kind {
                ToolKind::Search => ledger.searches.push(inv.argument.clone()),
                ToolKind::Extract => {
                    ledger.visited.insert(normalize_url(&inv.argument));
                    ledger.extracted.push(inv.argument.clone());
                }
            }
        }
        ledger
    }

    pub fn from_transcript(messages: &[TranscriptMessage]) -> Self {
        Self::from_invocations(&decode_invocations(messages))
    }

    /// True when the agent issued no recognized tool calls at all.
    pub fn is_empty(&self) -> bool {
        self.searches.is_empty() && self.extracted.is_empty()
    }
}

/// Normalization applied to URLs before membership checks.
pub fn normalize_url(url: &str) -> String {
    url.trim().to_lowercase()
}
