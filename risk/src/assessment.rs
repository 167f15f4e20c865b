//! The scored, auditable outcome of one session-creation attempt.

use serde::{Deserialize, Serialize};
use std::fmt;
use tahaqq_types::{DeviceFingerprint, Timestamp};

/// Allow the attempt to proceed to provider launch, or block it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskDecision {
    Allow,
    Block,
}

/// Why a blocked attempt was blocked, keyed by severity band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockedReason {
    HighFraudRisk,
    SuspiciousActivity,
    MultipleFailedAttempts,
    ThresholdExceeded,
}

impl BlockedReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::HighFraudRisk => "high_fraud_risk",
            Self::SuspiciousActivity => "suspicious_activity",
            Self::MultipleFailedAttempts => "multiple_failed_attempts",
            Self::ThresholdExceeded => "threshold_exceeded",
        }
    }

    /// Operator-facing message, stable across releases.
    pub fn message(&self) -> &'static str {
        match self {
            Self::HighFraudRisk => "High fraud risk detected",
            Self::SuspiciousActivity => "Suspicious activity pattern",
            Self::MultipleFailedAttempts => "Multiple failed attempts",
            Self::ThresholdExceeded => "Risk threshold exceeded",
        }
    }
}

impl fmt::Display for BlockedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Score decomposition plus decision for one attempt.
///
/// Assessments are append-only: each attempt produces a new record and
/// earlier ones are never overwritten, so the full decision trail can be
/// replayed for audit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub device_fingerprint: DeviceFingerprint,
    /// Over-attempt-ceiling plus burst contributions.
    pub attempt_frequency_score: u8,
    /// Fingerprint-drift contribution.
    pub device_consistency_score: u8,
    /// Headless/tooling contributions, capped per category.
    pub automation_score: u8,
    /// Geo-mismatch plus VPN contributions (stub signals).
    pub context_score: u8,
    /// Clamped sum of all categories.
    pub aggregate_risk_score: u8,
    pub decision: RiskDecision,
    /// Present iff `decision` is [`RiskDecision::Block`].
    pub blocked_reason: Option<BlockedReason>,
    pub assessed_at: Timestamp,
}

impl RiskAssessment {
    pub fn is_blocked(&self) -> bool {
        self.decision == RiskDecision::Block
    }
}
