#![forbid(unsafe_code)]

//! # veracity-harness
//!
//! Verification-aware multi-judge scoring for tool-using research agents.
//!
//! Asking one LLM to "rate this 1-10" is unreliable twice over: a single
//! judge is miscalibrated, and a judge can't tell a researched claim from a
//! confabulated one. This crate fixes both. It replays the agent's tool
//! transcript to reconstruct which pages were actually fetched, checks every
//! cited evidence URL against that ledger, injects the verification report
//! into the prompt of several independent judge models, clamps insight
//! scores for unverified claims no matter what the judges said, and takes
//! the per-prospect median across the panel so no single judge's outlier
//! moves the final score.
//!
//! The entry point is [`scorer::score_response`].

pub mod aggregate;
pub mod gateway;
pub mod ledger;
pub mod panel;
pub mod report;
pub mod scorer;
pub mod structured;
pub mod verify;

pub use aggregate::{ConsensusResult, ProspectConsensus, MAX_TOTAL, UNVERIFIED_INSIGHT_CAP};
pub use gateway::{Attribution, ChatGateway, NoopUsageSink, ProviderGateway, UsageSink};
pub use ledger::{ToolInvocation, ToolKind, ToolUsageLedger, TranscriptMessage};
pub use panel::{JudgeVerdict, PanelConfig, ProspectScore};
pub use scorer::{score_response, ScoreReport};
pub use structured::ProspectAnswer;
pub use verify::{MatchKind, VerificationOutcome};
