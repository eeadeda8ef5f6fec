//! Score aggregation: verification penalty, per-prospect median, consensus.
//!
//! Judges are told about verification in their prompt, but the penalty is
//! enforced here regardless of what they returned: a judge that scored an
//! unverified insight 9/10 gets clamped like everyone else. The clamp runs
//! after parsing and before the median, independently per judge, and is
//! idempotent.

use serde::Serialize;

use crate::panel::JudgeVerdict;
use crate::verify::VerificationOutcome;

/// Ceiling on the insight sub-score for a prospect whose evidence did not
/// verify (out of 10).
pub const UNVERIFIED_INSIGHT_CAP: f64 = 2.0;

/// Maximum possible total: sum of the four sub-score ceilings.
pub const MAX_TOTAL: f64 = 40.0;

/// Consensus for one roster slot.
#[derive(Debug, Clone, Serialize)]
pub struct ProspectConsensus {
    pub name: String,
    pub median_total: f64,
    /// `median_total / 40`, in [0, 1].
    pub normalized: f64,
    pub verified: bool,
}

/// Final, immutable output of an aggregation pass.
#[derive(Debug, Clone, Serialize)]
pub struct ConsensusResult {
    pub prospects: Vec<ProspectConsensus>,
    /// Mean of per-prospect normalized scores across the full roster.
    pub overall: f64,
    /// Fraction of the roster with verified evidence.
    pub verification_rate: f64,
}

/// Clamp insight scores for unverified prospects and recompute totals.
///
/// Applies to every successfully parsed verdict; `Failed` verdicts are
/// untouched. A prospect index with no corresponding outcome is left alone
/// (it will not contribute to the roster median anyway).
pub fn apply_verification_penalty(
    verdicts: &mut [JudgeVerdict],
    outcomes: &[VerificationOutcome],
) {
    for verdict in verdicts {
        let JudgeVerdict::Scored { prospects, .. } = verdict else {
            continue;
        };
        for (i, score) in prospects.iter_mut().enumerate() {
            let unverified = matches!(outcomes.get(i), Some(o) if !o.verified);
            if unverified {
                score.insight_score = score.insight_score.min(UNVERIFIED_INSIGHT_CAP);
                score.total =
                    score.pain_score + score.insight_score + score.fit_score + score.reply_score;
            }
        }
    }
}

/// Statistical median. Empty input yields 0 — an unscoreable prospect must
/// not crash the run.
pub fn median(totals: &[f64]) -> f64 {
    if totals.is_empty() {
        return 0.0;
    }
    let mut sorted = totals.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Combine penalized verdicts into the per-prospect median consensus.
///
/// For each roster slot, the median runs over the totals of every judge
/// that produced a usable score for that index; failed judges and short
/// verdicts simply contribute nothing.
pub fn aggregate(
    roster_names: &[String],
    outcomes: &[VerificationOutcome],
    verdicts: &[JudgeVerdict],
) -> ConsensusResult {
    let prospects: Vec<ProspectConsensus> = roster_names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let totals: Vec<f64> = verdicts
                .iter()
                .filter_map(|v| match v {
                    JudgeVerdict::Scored { prospects, .. } => {
                        prospects.get(i).map(|p| p.total)
                    }
                    JudgeVerdict::Failed { .. } => None,
                })
                .collect();

            let median_total = median(&totals);
            ProspectConsensus {
                name: name.clone(),
                median_total,
                normalized: median_total / MAX_TOTAL,
                verified: outcomes.get(i).map(|o| o.verified).unwrap_or(false),
            }
        })
        .collect();

    let overall = if prospects.is_empty() {
        0.0
    } else {
        prospects.iter().map(|p| p.normalized).sum::<f64>() / prospects.len() as f64
    };
    let verification_rate = if prospects.is_empty() {
        0.0
    } else {
        prospects.iter().filter(|p| p.verified).count() as f64 / prospects.len() as f64
    };

    ConsensusResult {
        prospects,
        overall,
        verification_rate,
    }
}
