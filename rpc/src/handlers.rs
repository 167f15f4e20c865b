//! Request/response DTOs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tahaqq_service::{CreateSessionOutcome, SessionView};
use tahaqq_types::{CountryCode, DeviceSignals, RegionalAttachment, VerificationType};

// ── Create ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateSessionBody {
    pub verification_type: VerificationType,
    pub country: CountryCode,
    pub return_url: String,
    #[serde(default)]
    pub client_reference: Option<String>,
    #[serde(default)]
    pub regional_context: Option<RegionalAttachment>,
    pub device_signals: DeviceSignals,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Serialize)]
pub struct CreateSessionResponse {
    /// "launched" or "block".
    pub decision: &'static str,
    pub session: SessionView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosted_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl From<CreateSessionOutcome> for CreateSessionResponse {
    fn from(outcome: CreateSessionOutcome) -> Self {
        match outcome {
            CreateSessionOutcome::Launched {
                session,
                hosted_url,
            } => Self {
                decision: "launched",
                session,
                hosted_url: Some(hosted_url),
                blocked_reason: None,
                message: None,
            },
            CreateSessionOutcome::Blocked {
                session,
                reason,
                message,
            } => Self {
                decision: "block",
                session,
                hosted_url: None,
                blocked_reason: Some(reason.code()),
                message: Some(message),
            },
        }
    }
}

// ── Status / context / cancel ────────────────────────────────────────────

#[derive(Serialize)]
pub struct SessionResponse {
    pub session: SessionView,
}

/// The attach-context body is the tagged attachment itself.
pub type AttachContextBody = RegionalAttachment;

// ── Reporting ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ListSessionsQuery {
    pub country: String,
    /// Epoch seconds, inclusive. Defaults to 0.
    #[serde(default)]
    pub from: u64,
    /// Epoch seconds, exclusive. Defaults to the end of time.
    #[serde(default = "default_to")]
    pub to: u64,
}

fn default_to() -> u64 {
    u64::MAX
}

#[derive(Serialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<SessionView>,
}
