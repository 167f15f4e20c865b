//! Events emitted by the engine for the service to process — logging,
//! metrics, and neural-sync fan-out all hang off these.

use tahaqq_risk::BlockedReason;
use tahaqq_types::{FailureReason, ProviderSessionId, SessionOid, SessionStatus};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// Regional context attached and validated (possibly degraded).
    ContextValidated { oid: SessionOid, degraded: bool },
    /// Risk assessment completed and the attempt may proceed.
    RiskAllowed { oid: SessionOid, score: u8 },
    /// Risk assessment blocked the attempt; the session failed without a
    /// provider call.
    RiskBlocked {
        oid: SessionOid,
        score: u8,
        reason: BlockedReason,
    },
    /// Provider session created; now polling.
    Launched {
        oid: SessionOid,
        provider_session_id: ProviderSessionId,
    },
    /// The session reached a terminal state.
    Completed {
        oid: SessionOid,
        status: SessionStatus,
        reason: Option<FailureReason>,
    },
}

impl SessionEvent {
    pub fn oid(&self) -> &SessionOid {
        match self {
            Self::ContextValidated { oid, .. }
            | Self::RiskAllowed { oid, .. }
            | Self::RiskBlocked { oid, .. }
            | Self::Launched { oid, .. }
            | Self::Completed { oid, .. } => oid,
        }
    }
}
