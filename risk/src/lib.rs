//! Fraud/risk scoring for verification attempts.
//!
//! The scorer is a pure function: identical inputs always produce the same
//! assessment, so every decision is replayable for audits. Scores are
//! additive per category and the aggregate is clamped to [0, 100]; the
//! decision rule and all weights live in [`tahaqq_types::RiskParams`].
//!
//! Missing telemetry contributes nothing (fail open); only explicit
//! indicators score (fail closed).

pub mod assessment;
pub mod history;
pub mod scorer;

pub use assessment::{BlockedReason, RiskAssessment, RiskDecision};
pub use history::AttemptHistory;
pub use scorer::assess;
