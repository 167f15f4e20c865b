//! The verification session record and its status vocabulary.

use crate::country::CountryCode;
use crate::oid::{ProviderSessionId, SessionOid};
use crate::regional::RegionalAttachment;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What kind of identity evidence the session verifies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationType {
    Document,
    IdNumber,
}

impl VerificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::IdNumber => "id_number",
        }
    }
}

/// Lifecycle state of a verification session.
///
/// `Created → ContextPending → ReadyForReview → Launching →
/// ProviderProcessing → {Verified | RequiresInput | Failed | Canceled}`.
/// Transitions are monotonic; only `ProviderProcessing` re-enters itself
/// on status polls. The four tail states are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    ContextPending,
    ReadyForReview,
    Launching,
    ProviderProcessing,
    Verified,
    RequiresInput,
    Failed,
    Canceled,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Verified | Self::RequiresInput | Self::Failed | Self::Canceled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::ContextPending => "context_pending",
            Self::ReadyForReview => "ready_for_review",
            Self::Launching => "launching",
            Self::ProviderProcessing => "provider_processing",
            Self::Verified => "verified",
            Self::RequiresInput => "requires_input",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stable reason code attached to a `Failed` session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The risk scorer blocked the attempt (business decision).
    RiskBlocked,
    /// The identity provider could not be reached within the retry budget.
    ProviderUnreachable,
    /// `expires_at` passed while the session was still processing.
    Expired,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RiskBlocked => "risk_blocked",
            Self::ProviderUnreachable => "provider_unreachable",
            Self::Expired => "expired",
        }
    }
}

/// One verification attempt, from intake to terminal state.
///
/// Sessions are never physically deleted; terminal sessions are retained
/// for audit and expired sessions become read-only. The `version` field is
/// the optimistic-concurrency token the store checks on every write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSession {
    pub oid: SessionOid,
    pub provider_session_id: Option<ProviderSessionId>,
    pub verification_type: VerificationType,
    pub country: CountryCode,
    pub status: SessionStatus,
    pub failure_reason: Option<FailureReason>,
    /// Aggregate risk score from the most recent assessment (0–100).
    pub risk_score: u8,
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub regional_attachment: Option<RegionalAttachment>,
    /// Set when regional validation could not complete definitively.
    pub regional_validation_degraded: bool,
    /// Where the operator UI sends the subject after the hosted flow.
    pub return_url: String,
    pub metadata: BTreeMap<String, String>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub version: u64,
}

impl VerificationSession {
    /// A freshly created session in `Created` with attempt 1.
    pub fn new(
        oid: SessionOid,
        verification_type: VerificationType,
        country: CountryCode,
        return_url: String,
        metadata: BTreeMap<String, String>,
        max_attempts: u32,
        created_at: Timestamp,
        ttl_secs: u64,
    ) -> Self {
        Self {
            oid,
            provider_session_id: None,
            verification_type,
            country,
            status: SessionStatus::Created,
            failure_reason: None,
            risk_score: 0,
            attempt_count: 1,
            max_attempts,
            regional_attachment: None,
            regional_validation_degraded: false,
            return_url,
            metadata,
            created_at,
            expires_at: created_at.plus_secs(ttl_secs),
            completed_at: None,
            version: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Exceeding `max_attempts` is a risk penalty, not a hard failure.
    pub fn attempts_exceeded(&self) -> bool {
        self.attempt_count > self.max_attempts
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}
