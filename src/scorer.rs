//! End-to-end scoring of one agent run.
//!
//! Wires together:
//! - ToolUsageLedger (what the agent actually searched and fetched)
//! - StructuredResponseParser (agent answer and judge replies)
//! - EvidenceVerifier + VerificationReportBuilder (annotated judge prompt)
//! - JudgePanelDispatcher (concurrent, independently-failable judges)
//! - ScoreAggregator (penalty, median, consensus)
//!
//! The scorer never returns an error: every recoverable condition degrades
//! the pertinent score component instead. The one hard failure mode — no
//! parsable answer and no tool activity — short-circuits to a zero score
//! without spending judge calls, since judging garbage cannot produce
//! meaningful insight scores.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::aggregate::{aggregate, apply_verification_penalty, ConsensusResult};
use crate::gateway::ChatGateway;
use crate::ledger::{ToolUsageLedger, TranscriptMessage};
use crate::panel::{dispatch_panel, JudgeVerdict, PanelConfig};
use crate::report::{pad_roster, render_judge_prompt, RosterSlot};
use crate::structured::{extract_structured, parse_agent_answer, ProspectAnswer};
use crate::verify::VerificationOutcome;

/// Final output of one evaluation. Complete enough to answer "why this
/// score" without re-running anything.
#[derive(Debug, Clone)]
pub struct ScoreReport {
    /// Overall normalized score in [0, 1].
    pub value: f64,
    /// Pretty-printed prospect array the score was computed over.
    pub answer: String,
    /// Human-readable summary embedding score and verification fraction.
    pub explanation: String,
    /// Audit trail: consensus, every verdict (or its error), verification
    /// outcomes, tool-usage counts.
    pub metadata: Value,
}

/// Score one agent run against the configured judge panel.
pub async fn score_response<G: ChatGateway>(
    gateway: &G,
    config: &PanelConfig,
    transcript: &[TranscriptMessage],
    final_answer: &str,
) -> ScoreReport {
    let ledger = ToolUsageLedger::from_transcript(transcript);

    let answers = match extract_structured(final_answer) {
        Some(value) => match parse_agent_answer(&value) {
            Some(answers) => answers,
            // Structural absence: a JSON object with no prospects array
            // attributes no partial credit to anything.
            None => {
                return zero_report("Response missing 'prospects' array", &ledger);
            }
        },
        None => {
            if ledger.is_empty() {
                return zero_report("Invalid JSON output and no tool usage detected", &ledger);
            }
            // The agent did real work but formatted the answer badly.
            // Judge a blank roster rather than zeroing the run; empty
            // evidence URLs never verify, so insight stays clamped.
            warn!("agent used tools but produced invalid JSON; judging blank roster");
            config
                .expected_prospects
                .iter()
                .map(ProspectAnswer::placeholder)
                .collect()
        }
    };

    let slots = pad_roster(&answers, &config.expected_prospects);
    let outcomes: Vec<VerificationOutcome> = slots
        .iter()
        .map(|s| VerificationOutcome::check(&s.answer.name, &s.answer.evidence_url, &ledger))
        .collect();

    let prompt = render_judge_prompt(config, &slots, &outcomes, &ledger);
    debug!(judges = config.judges.len(), "dispatching judge panel");

    let mut verdicts = dispatch_panel(gateway, &config.judges, &prompt).await;
    apply_verification_penalty(&mut verdicts, &outcomes);

    let roster_names: Vec<String> = slots.iter().map(|s| s.answer.name.clone()).collect();
    let consensus = aggregate(&roster_names, &outcomes, &verdicts);

    let verified_count = consensus.prospects.iter().filter(|p| p.verified).count();
    let explanation = format!(
        "Score: {:.3}, Verification: {:.1}% ({}/{} verified)",
        consensus.overall,
        consensus.verification_rate * 100.0,
        verified_count,
        consensus.prospects.len(),
    );

    let answer = serde_json::to_string_pretty(&slots_answers(&slots)).unwrap_or_default();
    let metadata = build_metadata(&consensus, &outcomes, &verdicts, &ledger);

    ScoreReport {
        value: consensus.overall,
        answer,
        explanation,
        metadata,
    }
}

fn slots_answers(slots: &[RosterSlot]) -> Vec<&ProspectAnswer> {
    slots.iter().map(|s| &s.answer).collect()
}

fn zero_report(reason: &str, ledger: &ToolUsageLedger) -> ScoreReport {
    warn!(reason, "evaluation short-circuited to zero");
    ScoreReport {
        value: 0.0,
        answer: String::new(),
        explanation: reason.to_string(),
        metadata: json!({
            "failure": reason,
            "tool_usage": tool_usage_json(ledger),
        }),
    }
}

fn build_metadata(
    consensus: &ConsensusResult,
    outcomes: &[VerificationOutcome],
    verdicts: &[JudgeVerdict],
    ledger: &ToolUsageLedger,
) -> Value {
    json!({
        "prospect_scores": consensus.prospects,
        "judge_responses": verdicts,
        "verification_results": outcomes,
        "tool_usage": tool_usage_json(ledger),
        "overall": consensus.overall,
        "verification_rate": consensus.verification_rate,
    })
}

fn tool_usage_json(ledger: &ToolUsageLedger) -> Value {
    json!({
        "searches": ledger.searches.len(),
        "extracts": ledger.extracted.len(),
        "urls_extracted": ledger.extracted,
    })
}
