//! Evidence verification against the tool-usage ledger.
//!
//! A claim is only as good as the page the agent actually read. An evidence
//! URL verifies when the ledger shows the agent extracted exactly that URL,
//! or any URL on the same host. The same-origin fallback is intentionally
//! lenient: agents routinely cite a canonical URL after reaching the content
//! through a redirect or a sibling path, and penalizing that would punish
//! honest citations. The cost is that an unrelated page on a shared host
//! also passes; see DESIGN.md for the trade-off.

use serde::Serialize;
use url::Url;

use crate::ledger::{normalize_url, ToolUsageLedger};

/// How an evidence URL matched the ledger, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Normalized URL is in the visited set.
    Exact,
    /// Host matches a visited URL's host, full URL differs.
    SameOrigin,
    /// No match.
    None,
}

/// Verification result for one prospect's evidence URL. Never mutated after
/// creation.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationOutcome {
    pub prospect: String,
    pub evidence_url: String,
    pub verified: bool,
    pub matched_via: MatchKind,
}

impl VerificationOutcome {
    pub fn check(
        prospect: impl Into<String>,
        evidence_url: impl Into<String>,
        ledger: &ToolUsageLedger,
    ) -> Self {
        let evidence_url = evidence_url.into();
        let matched_via = match_evidence(&evidence_url, ledger);
        Self {
            prospect: prospect.into(),
            evidence_url,
            verified: matched_via != MatchKind::None,
            matched_via,
        }
    }
}

/// Decide how (and whether) an evidence URL matches the ledger.
///
/// Empty URLs never verify. Malformed URLs (no parsable host) fall through
/// to `None` rather than erroring — verification-indeterminate is just
/// unverified.
pub fn match_evidence(evidence_url: &str, ledger: &ToolUsageLedger) -> MatchKind {
    let normalized = normalize_url(evidence_url);
    if normalized.is_empty() {
        return MatchKind::None;
    }

    if ledger.visited.contains(&normalized) {
        return MatchKind::Exact;
    }

    if let Some(evidence_host) = host_of(&normalized) {
        for visited in &ledger.visited {
            if host_of(visited).as_deref() == Some(evidence_host.as_str()) {
                return MatchKind::SameOrigin;
            }
        }
    }

    MatchKind::None
}

fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}
