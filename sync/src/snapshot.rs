//! The snapshot payload pushed over the sync channel.

use serde::{Deserialize, Serialize};
use tahaqq_types::{CountryCode, SessionOid, SessionStatus, Timestamp, VerificationSession};

/// Point-in-time view of a session's verification context.
///
/// The receiving side is assumed (not guaranteed) idempotent; the
/// dispatcher delivers at-least-once and performs no deduplication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub oid: SessionOid,
    pub status: SessionStatus,
    pub risk_score: u8,
    pub country: CountryCode,
    pub regional_validation_degraded: bool,
    pub captured_at: Timestamp,
}

impl ContextSnapshot {
    pub fn capture(session: &VerificationSession, now: Timestamp) -> Self {
        Self {
            oid: session.oid.clone(),
            status: session.status,
            risk_score: session.risk_score,
            country: session.country.clone(),
            regional_validation_degraded: session.regional_validation_degraded,
            captured_at: now,
        }
    }
}
