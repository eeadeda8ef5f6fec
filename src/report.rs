//! Verification report and judge prompt rendering.
//!
//! Pure formatting: given the padded roster, the verification outcomes, and
//! the ledger, produce the exact text the judges see. Deterministic for a
//! given input set — judge prompts must be reproducible and the report is
//! golden-tested.

use crate::ledger::ToolUsageLedger;
use crate::panel::PanelConfig;
use crate::structured::ProspectAnswer;
use crate::verify::{MatchKind, VerificationOutcome};

/// How many extracted URLs to sample into the tool-usage summary.
const EXTRACT_SAMPLE: usize = 3;

// =============================================================================
// Roster padding
// =============================================================================

/// A fixed roster slot: the agent's answer (or a blank placeholder) plus
/// whether the agent actually provided it.
#[derive(Debug, Clone)]
pub struct RosterSlot {
    pub answer: ProspectAnswer,
    pub provided: bool,
}

/// Fit the agent's answers to the expected roster.
///
/// Missing slots are padded with blank placeholders named after the
/// expected prospect; answers beyond the roster are ignored. Placeholder
/// names also backfill answers that omitted the name.
pub fn pad_roster(answers: &[ProspectAnswer], expected: &[String]) -> Vec<RosterSlot> {
    expected
        .iter()
        .enumerate()
        .map(|(i, expected_name)| match answers.get(i) {
            Some(answer) => {
                let mut answer = answer.clone();
                if answer.name.is_empty() {
                    answer.name = expected_name.clone();
                }
                RosterSlot {
                    answer,
                    provided: true,
                }
            }
            None => RosterSlot {
                answer: ProspectAnswer::placeholder(expected_name),
                provided: false,
            },
        })
        .collect()
}

// =============================================================================
// Verification report
// =============================================================================

/// Render the per-prospect verification lines plus the tool-usage summary.
pub fn render_verification_report(
    outcomes: &[VerificationOutcome],
    ledger: &ToolUsageLedger,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    for outcome in outcomes {
        lines.push(verification_line(outcome));
    }

    lines.push(String::new());
    lines.push("Tool Usage Summary:".to_string());
    lines.push(format!("- Searches issued: {}", ledger.searches.len()));
    lines.push(format!("- URLs extracted: {}", ledger.extracted.len()));
    if ledger.extracted.is_empty() {
        lines.push("- No URLs were extracted!".to_string());
    } else {
        let sample: Vec<&str> = ledger
            .extracted
            .iter()
            .take(EXTRACT_SAMPLE)
            .map(String::as_str)
            .collect();
        lines.push(format!("- Extracted: {}", sample.join(", ")));
    }

    lines.join("\n")
}

fn verification_line(outcome: &VerificationOutcome) -> String {
    match outcome.matched_via {
        MatchKind::Exact => format!(
            "VERIFIED {}: agent extracted this exact URL ({})",
            outcome.prospect, outcome.evidence_url
        ),
        MatchKind::SameOrigin => format!(
            "VERIFIED {}: agent extracted a page on the same site as {}",
            outcome.prospect, outcome.evidence_url
        ),
        MatchKind::None => {
            if outcome.evidence_url.trim().is_empty() {
                format!("NOT VERIFIED {}: no evidence URL provided", outcome.prospect)
            } else {
                format!(
                    "NOT VERIFIED {}: agent never extracted {} or any page on its site",
                    outcome.prospect, outcome.evidence_url
                )
            }
        }
    }
}

// =============================================================================
// Judge prompt
// =============================================================================

const JUDGE_PROMPT_TEMPLATE: &str = r#"You're evaluating personalized first lines for {company} prospects.

VERIFICATION STATUS FROM SYSTEM:
{verification_report}

Scoring Criteria:
1. {pain_focus} (35%) - Does it hit a real pain point?
2. Prospect-Specific Insight (30%) - Verifiable, non-obvious details
3. {company} Fit (25%) - Natural connection to value prop
4. Reply Test (10%) - Would they actually reply?

IMPORTANT:
- If a URL was NOT verified (the agent never extracted it), heavily penalize the insight score
- Only give high scores to claims backed by VERIFIED evidence

Evaluate ALL {roster_len} prospects below:

{prospect_roster}
Output JSON only, with one entry per prospect in roster order:
{
  "prospects": [
    {
      "name": "<prospect name>",
      "pain_score": 0-10,
      "insight_score": 0-10,
      "fit_score": 0-10,
      "reply_score": 0-10,
      "total": 0-40,
      "rationale": "Brief explanation"
    }
  ]
}"#;

/// Render the roster block shown to judges.
pub fn render_prospect_roster(slots: &[RosterSlot], outcomes: &[VerificationOutcome]) -> String {
    let mut out = String::new();

    for (i, slot) in slots.iter().enumerate() {
        let status = if !slot.provided {
            "MISSING"
        } else {
            match outcomes.get(i).map(|o| o.verified) {
                Some(true) => "VERIFIED",
                _ => "NOT VERIFIED",
            }
        };

        let first_line = if slot.answer.first_line.is_empty() {
            "[NO RESPONSE PROVIDED]"
        } else {
            slot.answer.first_line.as_str()
        };

        out.push_str(&format!(
            "Prospect {}: {}\nFirst Line: {}\nEvidence URL: {}\nVERIFICATION: {}\n\n",
            i + 1,
            slot.answer.name,
            first_line,
            slot.answer.evidence_url,
            status,
        ));
    }

    out
}

/// Render the complete judge prompt: rubric, verification report, roster.
pub fn render_judge_prompt(
    config: &PanelConfig,
    slots: &[RosterSlot],
    outcomes: &[VerificationOutcome],
    ledger: &ToolUsageLedger,
) -> String {
    let verification_report = render_verification_report(outcomes, ledger);
    let prospect_roster = render_prospect_roster(slots, outcomes);

    JUDGE_PROMPT_TEMPLATE
        .replace("{company}", &config.company)
        .replace("{pain_focus}", &config.pain_focus)
        .replace("{verification_report}", &verification_report)
        .replace("{roster_len}", &slots.len().to_string())
        .replace("{prospect_roster}", &prospect_roster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{ToolInvocation, ToolKind, ToolUsageLedger};
    use crate::verify::VerificationOutcome;

    fn expected() -> Vec<String> {
        vec!["Ada".to_string(), "Grace".to_string(), "Edsger".to_string()]
    }

    fn ledger_with(urls: &[&str]) -> ToolUsageLedger {
        let invocations: Vec<ToolInvocation> = urls
            .iter()
            .enumerate()
            .map(|(i, u)| ToolInvocation {
                kind: ToolKind::Extract,
                argument: u.to_string(),
                issued_at: i,
            })
            .collect();
        ToolUsageLedger::from_invocations(&invocations)
    }

    fn outcomes_for(slots: &[RosterSlot], ledger: &ToolUsageLedger) -> Vec<VerificationOutcome> {
        slots
            .iter()
            .map(|s| VerificationOutcome::check(&s.answer.name, &s.answer.evidence_url, ledger))
            .collect()
    }

    #[test]
    fn pad_roster_fills_missing_slots() {
        let answers = vec![ProspectAnswer {
            name: "Ada".into(),
            first_line: "hello".into(),
            evidence_url: "https://x.com/a".into(),
            evidence_quote: String::new(),
        }];

        let slots = pad_roster(&answers, &expected());
        assert_eq!(slots.len(), 3);
        assert!(slots[0].provided);
        assert!(!slots[1].provided);
        assert_eq!(slots[1].answer.name, "Grace");
        assert!(slots[2].answer.first_line.is_empty());
    }

    #[test]
    fn pad_roster_ignores_extras_and_backfills_names() {
        let answers = vec![
            ProspectAnswer::placeholder(""),
            ProspectAnswer::placeholder(""),
            ProspectAnswer::placeholder(""),
            ProspectAnswer::placeholder("Surplus"),
        ];
        let slots = pad_roster(&answers, &expected());
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].answer.name, "Ada");
        assert_eq!(slots[2].answer.name, "Edsger");
    }

    #[test]
    fn report_is_deterministic() {
        let ledger = ledger_with(&["https://x.com/a", "https://y.com/b"]);
        let slots = pad_roster(
            &[ProspectAnswer {
                name: "Ada".into(),
                first_line: "hi".into(),
                evidence_url: "https://x.com/a".into(),
                evidence_quote: String::new(),
            }],
            &expected(),
        );
        let outcomes = outcomes_for(&slots, &ledger);

        let once = render_verification_report(&outcomes, &ledger);
        let twice = render_verification_report(&outcomes, &ledger);
        assert_eq!(once, twice);

        assert!(once.contains("VERIFIED Ada: agent extracted this exact URL"));
        assert!(once.contains("NOT VERIFIED Grace: no evidence URL provided"));
        assert!(once.contains("- URLs extracted: 2"));
        assert!(once.contains("https://x.com/a, https://y.com/b"));
    }

    #[test]
    fn report_flags_missing_extraction() {
        let ledger = ledger_with(&[]);
        let slots = pad_roster(&[], &expected());
        let outcomes = outcomes_for(&slots, &ledger);

        let report = render_verification_report(&outcomes, &ledger);
        assert!(report.contains("- No URLs were extracted!"));
    }

    #[test]
    fn roster_marks_missing_slots() {
        let ledger = ledger_with(&[]);
        let slots = pad_roster(&[ProspectAnswer::placeholder("Ada")], &expected());
        let outcomes = outcomes_for(&slots, &ledger);

        let roster = render_prospect_roster(&slots, &outcomes);
        assert!(roster.contains("Prospect 1: Ada"));
        assert!(roster.contains("VERIFICATION: NOT VERIFIED"));
        assert!(roster.contains("Prospect 2: Grace"));
        assert!(roster.contains("VERIFICATION: MISSING"));
        assert!(roster.contains("[NO RESPONSE PROVIDED]"));
    }

    #[test]
    fn judge_prompt_embeds_context_and_report() {
        let config = PanelConfig::default();
        let ledger = ledger_with(&["https://x.com/a"]);
        let slots = pad_roster(&[], &config.expected_prospects);
        let outcomes = outcomes_for(&slots, &ledger);

        let prompt = render_judge_prompt(&config, &slots, &outcomes, &ledger);
        assert!(prompt.contains("Homebase prospects"));
        assert!(prompt.contains("Ops/Labor Pain Recognition (35%)"));
        assert!(prompt.contains("VERIFICATION STATUS FROM SYSTEM:"));
        assert!(prompt.contains("Evaluate ALL 3 prospects"));
        assert!(prompt.contains("Prospect 3: Tiffany Porter"));
        // No unexpanded placeholders left behind.
        assert!(!prompt.contains("{company}"));
        assert!(!prompt.contains("{verification_report}"));
    }
}
