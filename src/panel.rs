//! Judge panel configuration and concurrent dispatch.
//!
//! Each configured judge gets the same verification-annotated prompt and
//! produces exactly one tagged [`JudgeVerdict`]. Dispatch is one task per
//! judge, run concurrently and bounded by the panel size; a judge that
//! errors or replies with unparsable JSON becomes a `Failed` verdict and is
//! simply absent from the median later. No verdict is ever a raw error.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::gateway::{Attribution, ChatGateway, ChatModel, ChatRequest, Message};
use crate::structured::extract_structured;

/// Generation cap for a judge verdict. Three prospects of scores plus
/// rationales fit comfortably; reasoning-heavy models need the headroom.
const JUDGE_MAX_OUTPUT_TOKENS: u32 = 2_000;

// =============================================================================
// Configuration
// =============================================================================

/// Panel configuration, passed in explicitly by the caller.
///
/// `Default` is the stock Revenue Bench setup: four OpenRouter judges and
/// the Homebase prospect roster. Callers that want a different panel or
/// task context construct their own.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// OpenRouter model ids acting as judges.
    pub judges: Vec<String>,
    /// Company the outreach is written for; appears in the judge rubric.
    pub company: String,
    /// Name of the pain-recognition criterion, task-specific.
    pub pain_focus: String,
    /// Expected prospect names, in roster order. Fixes the roster size.
    pub expected_prospects: Vec<String>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            judges: vec![
                "google/gemini-2.5-pro".to_string(),
                "moonshotai/kimi-k2".to_string(),
                "openai/gpt-5-mini".to_string(),
                "anthropic/claude-opus-4.1".to_string(),
            ],
            company: "Homebase".to_string(),
            pain_focus: "Ops/Labor Pain Recognition".to_string(),
            expected_prospects: vec![
                "Matthew Christy".to_string(),
                "Isaac Reback".to_string(),
                "Tiffany Porter".to_string(),
            ],
        }
    }
}

// =============================================================================
// Verdicts
// =============================================================================

/// Per-prospect scores from one judge. Sub-scores are on a 0-10 scale;
/// `total` is their sum (0-40), recomputed after the verification penalty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProspectScore {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pain_score: f64,
    #[serde(default)]
    pub insight_score: f64,
    #[serde(default)]
    pub fit_score: f64,
    #[serde(default)]
    pub reply_score: f64,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub rationale: String,
}

/// Outcome of one judge dispatch. A failure is data, not an error: it is
/// recorded in the audit metadata and excluded from aggregation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JudgeVerdict {
    Scored {
        judge: String,
        prospects: Vec<ProspectScore>,
        /// Verbatim judge reply, kept for the audit trail.
        raw: String,
    },
    Failed {
        judge: String,
        error: String,
    },
}

impl JudgeVerdict {
    pub fn judge(&self) -> &str {
        match self {
            JudgeVerdict::Scored { judge, .. } => judge,
            JudgeVerdict::Failed { judge, .. } => judge,
        }
    }
}

#[derive(Debug, Deserialize)]
struct VerdictJson {
    prospects: Vec<ProspectScore>,
}

/// Parse a judge reply into per-prospect scores.
///
/// Reuses the layered structured-text extraction, then requires a
/// `prospects` array — a reply without one carries no usable scores.
pub fn parse_verdict(raw: &str) -> Result<Vec<ProspectScore>, String> {
    let value =
        extract_structured(raw).ok_or_else(|| "no JSON object in judge reply".to_string())?;
    let verdict: VerdictJson = serde_json::from_value(value)
        .map_err(|e| format!("judge reply missing usable 'prospects' array: {e}"))?;
    Ok(verdict.prospects)
}

// =============================================================================
// Dispatch
// =============================================================================

/// Send the rendered prompt to every judge concurrently and collect one
/// verdict per judge.
///
/// Concurrency is bounded by the panel size. Completion order is
/// irrelevant: verdicts are keyed by judge id, and the returned vector
/// follows the configured judge order.
pub async fn dispatch_panel<G: ChatGateway>(
    gateway: &G,
    judges: &[String],
    prompt: &str,
) -> Vec<JudgeVerdict> {
    let mut verdicts: Vec<JudgeVerdict> = stream::iter(judges.iter().cloned())
        .map(|judge| async move { dispatch_one(gateway, judge, prompt).await })
        .buffer_unordered(judges.len().max(1))
        .collect()
        .await;

    // Restore configured order for stable audit output.
    verdicts.sort_by_key(|v| judges.iter().position(|j| j == v.judge()).unwrap_or(usize::MAX));
    verdicts
}

async fn dispatch_one<G: ChatGateway>(gateway: &G, judge: String, prompt: &str) -> JudgeVerdict {
    debug!(judge = %judge, "dispatching judge");

    let mut request = ChatRequest::new(
        ChatModel::openrouter(&judge),
        vec![Message::user(prompt)],
        Attribution::new("panel::judge"),
    )
    .max_tokens(JUDGE_MAX_OUTPUT_TOKENS);
    // Only OpenAI models reliably support response_format=json_object via OpenRouter.
    if judge.starts_with("openai/") {
        request = request.json();
    }

    let response = match gateway.chat(request).await {
        Ok(resp) => resp,
        Err(err) => {
            warn!(judge = %judge, error = %err, "judge dispatch failed");
            return JudgeVerdict::Failed {
                judge,
                error: err.to_string(),
            };
        }
    };

    match parse_verdict(&response.content) {
        Ok(prospects) => JudgeVerdict::Scored {
            judge,
            prospects,
            raw: response.content,
        },
        Err(err) => {
            warn!(judge = %judge, error = %err, "judge reply unparsable");
            JudgeVerdict::Failed { judge, error: err }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_verdict_accepts_fenced_json() {
        let raw = r#"Sure, here are my scores:
```json
{"prospects": [{"name": "A", "pain_score": 8, "insight_score": 7, "fit_score": 6, "reply_score": 5, "total": 26, "rationale": "solid"}]}
```"#;
        let scores = parse_verdict(raw).unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].total, 26.0);
    }

    #[test]
    fn parse_verdict_defaults_missing_subscores() {
        let raw = r#"{"prospects": [{"name": "A", "pain_score": 3}]}"#;
        let scores = parse_verdict(raw).unwrap();
        assert_eq!(scores[0].insight_score, 0.0);
        assert_eq!(scores[0].total, 0.0);
    }

    #[test]
    fn parse_verdict_rejects_missing_prospects() {
        assert!(parse_verdict(r#"{"scores": []}"#).is_err());
        assert!(parse_verdict("I decline to score this.").is_err());
    }

    #[test]
    fn default_config_is_stock_panel() {
        let config = PanelConfig::default();
        assert_eq!(config.judges.len(), 4);
        assert_eq!(config.expected_prospects.len(), 3);
        assert_eq!(config.company, "Homebase");
    }
}
