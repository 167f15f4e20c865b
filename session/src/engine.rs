//! Transition rules.
//!
//! Every method checks the session's current status before mutating and
//! errors on anything out of order; callers persist the mutated record
//! afterwards. `completed_at` is stamped exactly once, when the session
//! first reaches a terminal state.

use crate::error::TransitionError;
use crate::event::SessionEvent;
use tahaqq_provider::ProviderStatus;
use tahaqq_risk::RiskAssessment;
use tahaqq_types::{
    FailureReason, OrchestrationParams, ProviderSessionId, RegionalAttachment, SessionStatus,
    Timestamp, VerificationSession,
};
use tracing::debug;

pub struct SessionEngine {
    params: OrchestrationParams,
}

impl SessionEngine {
    pub fn new(params: OrchestrationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &OrchestrationParams {
        &self.params
    }

    /// Attach regional context: `Created → ContextPending`.
    ///
    /// The attachment may be replaced while the session has not launched;
    /// it is locked from `Launching` onward.
    pub fn attach_context(
        &self,
        session: &mut VerificationSession,
        attachment: RegionalAttachment,
    ) -> Result<(), TransitionError> {
        Self::reject_terminal(session)?;
        match session.status {
            SessionStatus::Created | SessionStatus::ContextPending | SessionStatus::ReadyForReview => {}
            SessionStatus::Launching | SessionStatus::ProviderProcessing => {
                return Err(TransitionError::ContextLocked);
            }
            _ => unreachable!("terminal states rejected above"),
        }
        if !attachment.matches_country(&session.country) {
            return Err(TransitionError::AttachmentCountryMismatch(
                session.country.to_string(),
            ));
        }

        session.regional_attachment = Some(attachment);
        session.status = SessionStatus::ContextPending;
        Ok(())
    }

    /// Regional validation finished (success or degraded):
    /// `ContextPending → ReadyForReview`.
    pub fn complete_context(
        &self,
        session: &mut VerificationSession,
        degraded: bool,
    ) -> Result<SessionEvent, TransitionError> {
        Self::require(session, SessionStatus::ContextPending, "complete_context")?;
        session.regional_validation_degraded = degraded;
        session.status = SessionStatus::ReadyForReview;
        Ok(SessionEvent::ContextValidated {
            oid: session.oid.clone(),
            degraded,
        })
    }

    /// No regional context needed: `Created → ReadyForReview`.
    pub fn mark_ready(&self, session: &mut VerificationSession) -> Result<(), TransitionError> {
        Self::require(session, SessionStatus::Created, "mark_ready")?;
        session.status = SessionStatus::ReadyForReview;
        Ok(())
    }

    /// Record the risk decision. Allow keeps the session in
    /// `ReadyForReview`; block fails it immediately — no provider call is
    /// ever made for a blocked attempt.
    pub fn apply_risk(
        &self,
        session: &mut VerificationSession,
        assessment: &RiskAssessment,
    ) -> Result<SessionEvent, TransitionError> {
        Self::require(session, SessionStatus::ReadyForReview, "apply_risk")?;
        session.risk_score = assessment.aggregate_risk_score;

        match assessment.blocked_reason {
            None => Ok(SessionEvent::RiskAllowed {
                oid: session.oid.clone(),
                score: assessment.aggregate_risk_score,
            }),
            Some(reason) => {
                session.status = SessionStatus::Failed;
                session.failure_reason = Some(FailureReason::RiskBlocked);
                session.completed_at = Some(assessment.assessed_at);
                debug!(oid = %session.oid, score = assessment.aggregate_risk_score, "risk blocked");
                Ok(SessionEvent::RiskBlocked {
                    oid: session.oid.clone(),
                    score: assessment.aggregate_risk_score,
                    reason,
                })
            }
        }
    }

    /// Claim the launch transition: `ReadyForReview → Launching`.
    pub fn begin_launch(&self, session: &mut VerificationSession) -> Result<(), TransitionError> {
        Self::require(session, SessionStatus::ReadyForReview, "begin_launch")?;
        session.status = SessionStatus::Launching;
        Ok(())
    }

    /// Provider accepted the session: `Launching → ProviderProcessing`.
    pub fn complete_launch(
        &self,
        session: &mut VerificationSession,
        provider_session_id: ProviderSessionId,
    ) -> Result<SessionEvent, TransitionError> {
        Self::require(session, SessionStatus::Launching, "complete_launch")?;
        session.provider_session_id = Some(provider_session_id.clone());
        session.status = SessionStatus::ProviderProcessing;
        Ok(SessionEvent::Launched {
            oid: session.oid.clone(),
            provider_session_id,
        })
    }

    /// Provider could not be reached within the retry budget:
    /// `Launching → Failed(provider_unreachable)`.
    pub fn fail_launch(
        &self,
        session: &mut VerificationSession,
        now: Timestamp,
    ) -> Result<SessionEvent, TransitionError> {
        Self::require(session, SessionStatus::Launching, "fail_launch")?;
        Ok(self.complete_terminal(
            session,
            SessionStatus::Failed,
            Some(FailureReason::ProviderUnreachable),
            now,
        ))
    }

    /// Fold a provider status poll into the session.
    ///
    /// `Processing` re-enters `ProviderProcessing` (unless the session has
    /// expired); any other status is terminal. Polls never touch
    /// `attempt_count`.
    pub fn apply_provider_status(
        &self,
        session: &mut VerificationSession,
        status: ProviderStatus,
        now: Timestamp,
    ) -> Result<Option<SessionEvent>, TransitionError> {
        Self::require(session, SessionStatus::ProviderProcessing, "apply_provider_status")?;

        match status {
            ProviderStatus::Processing => Ok(self.expire_if_due(session, now)),
            ProviderStatus::Verified => Ok(Some(self.complete_terminal(
                session,
                SessionStatus::Verified,
                None,
                now,
            ))),
            ProviderStatus::RequiresInput => Ok(Some(self.complete_terminal(
                session,
                SessionStatus::RequiresInput,
                None,
                now,
            ))),
            ProviderStatus::Canceled => Ok(Some(self.complete_terminal(
                session,
                SessionStatus::Canceled,
                None,
                now,
            ))),
        }
    }

    /// Operator cancel of any non-terminal session.
    pub fn cancel(
        &self,
        session: &mut VerificationSession,
        now: Timestamp,
    ) -> Result<SessionEvent, TransitionError> {
        Self::reject_terminal(session)?;
        Ok(self.complete_terminal(session, SessionStatus::Canceled, None, now))
    }

    /// Fail the session if `expires_at` has passed. No-op otherwise, and
    /// on sessions already terminal.
    pub fn expire_if_due(
        &self,
        session: &mut VerificationSession,
        now: Timestamp,
    ) -> Option<SessionEvent> {
        if session.is_terminal() || !session.is_expired(now) {
            return None;
        }
        Some(self.complete_terminal(
            session,
            SessionStatus::Failed,
            Some(FailureReason::Expired),
            now,
        ))
    }

    fn complete_terminal(
        &self,
        session: &mut VerificationSession,
        status: SessionStatus,
        reason: Option<FailureReason>,
        now: Timestamp,
    ) -> SessionEvent {
        session.status = status;
        session.failure_reason = reason;
        if session.completed_at.is_none() {
            session.completed_at = Some(now);
        }
        SessionEvent::Completed {
            oid: session.oid.clone(),
            status,
            reason,
        }
    }

    fn require(
        session: &VerificationSession,
        expected: SessionStatus,
        operation: &'static str,
    ) -> Result<(), TransitionError> {
        Self::reject_terminal(session)?;
        if session.status != expected {
            return Err(TransitionError::InvalidTransition {
                from: session.status,
                operation,
            });
        }
        Ok(())
    }

    fn reject_terminal(session: &VerificationSession) -> Result<(), TransitionError> {
        if session.is_terminal() {
            return Err(TransitionError::TerminalState {
                oid: session.oid.to_string(),
                status: session.status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tahaqq_risk::{assess, AttemptHistory};
    use tahaqq_types::oid::DEFAULT_BASE_ARC;
    use tahaqq_types::{
        CountryCode, DeviceFingerprint, DeviceSignals, InsuranceStatus, RiskParams, SessionOid,
        VerificationType,
    };

    fn engine() -> SessionEngine {
        SessionEngine::new(OrchestrationParams::standard())
    }

    fn session_for(country: CountryCode) -> VerificationSession {
        VerificationSession::new(
            SessionOid::assemble(
                DEFAULT_BASE_ARC,
                &country,
                Timestamp::new(1_733_000_000),
                1,
            ),
            VerificationType::Document,
            country,
            "https://operator.example/return".into(),
            BTreeMap::new(),
            3,
            Timestamp::new(1_733_000_000),
            86_400,
        )
    }

    fn healthcare_attachment() -> RegionalAttachment {
        RegionalAttachment::Healthcare {
            nphies_id: "NPH-1".into(),
            facility_code: Some("KSA001".into()),
            practitioner_id: None,
            insurance_status: InsuranceStatus::Active,
            is_valid: true,
        }
    }

    fn allow_assessment(at: Timestamp) -> RiskAssessment {
        let fp = DeviceFingerprint::from_hash("device-1");
        let mut history = AttemptHistory::empty();
        history.record_attempt(&fp, at, 5);
        assess(
            &history,
            &DeviceSignals::clean(fp),
            3,
            &RiskParams::standard(),
            at,
        )
    }

    fn block_assessment(at: Timestamp) -> RiskAssessment {
        let fp = DeviceFingerprint::from_hash("device-1");
        let mut history = AttemptHistory::empty();
        for i in 0..4 {
            history.record_attempt(&fp, Timestamp::new(at.as_secs() + i), 5);
        }
        assess(
            &history,
            &DeviceSignals::clean(fp),
            3,
            &RiskParams::standard(),
            at,
        )
    }

    /// Drive a session to `ProviderProcessing`.
    fn processing_session() -> (SessionEngine, VerificationSession) {
        let engine = engine();
        let mut s = session_for(CountryCode::Sa);
        engine.mark_ready(&mut s).unwrap();
        let created_at = s.created_at;
        engine
            .apply_risk(&mut s, &allow_assessment(created_at))
            .unwrap();
        engine.begin_launch(&mut s).unwrap();
        engine
            .complete_launch(&mut s, ProviderSessionId::new("vs_1"))
            .unwrap();
        (engine, s)
    }

    // ── Context ────────────────────────────────────────────────────────

    #[test]
    fn context_flow_reaches_ready() {
        let engine = engine();
        let mut s = session_for(CountryCode::Sa);

        engine
            .attach_context(&mut s, healthcare_attachment())
            .unwrap();
        assert_eq!(s.status, SessionStatus::ContextPending);

        let event = engine.complete_context(&mut s, false).unwrap();
        assert_eq!(s.status, SessionStatus::ReadyForReview);
        assert!(!s.regional_validation_degraded);
        assert!(matches!(
            event,
            SessionEvent::ContextValidated { degraded: false, .. }
        ));
    }

    #[test]
    fn degraded_validation_still_reaches_ready() {
        let engine = engine();
        let mut s = session_for(CountryCode::Sa);
        engine
            .attach_context(&mut s, healthcare_attachment())
            .unwrap();

        engine.complete_context(&mut s, true).unwrap();
        assert_eq!(s.status, SessionStatus::ReadyForReview);
        assert!(s.regional_validation_degraded);
    }

    #[test]
    fn attachment_must_match_country() {
        let engine = engine();
        let mut s = session_for(CountryCode::Sd);
        let result = engine.attach_context(&mut s, healthcare_attachment());
        assert!(matches!(
            result,
            Err(TransitionError::AttachmentCountryMismatch(_))
        ));
        assert_eq!(s.status, SessionStatus::Created);
    }

    #[test]
    fn context_locked_after_launch() {
        let (engine, mut s) = processing_session();
        let result = engine.attach_context(&mut s, healthcare_attachment());
        assert_eq!(result, Err(TransitionError::ContextLocked));
    }

    // ── Risk ───────────────────────────────────────────────────────────

    #[test]
    fn allowed_risk_keeps_session_reviewable() {
        let engine = engine();
        let mut s = session_for(CountryCode::Us);
        engine.mark_ready(&mut s).unwrap();

        let created_at = s.created_at;
        let event = engine
            .apply_risk(&mut s, &allow_assessment(created_at))
            .unwrap();
        assert_eq!(s.status, SessionStatus::ReadyForReview);
        assert_eq!(s.risk_score, 0);
        assert!(matches!(event, SessionEvent::RiskAllowed { score: 0, .. }));
    }

    #[test]
    fn blocked_risk_fails_session_without_launch() {
        let engine = engine();
        let mut s = session_for(CountryCode::Us);
        engine.mark_ready(&mut s).unwrap();

        let assessment = block_assessment(s.created_at);
        let event = engine.apply_risk(&mut s, &assessment).unwrap();

        assert_eq!(s.status, SessionStatus::Failed);
        assert_eq!(s.failure_reason, Some(FailureReason::RiskBlocked));
        assert_eq!(s.risk_score, 100);
        assert_eq!(s.completed_at, Some(assessment.assessed_at));
        assert!(matches!(event, SessionEvent::RiskBlocked { score: 100, .. }));

        // No launch possible afterwards.
        assert!(engine.begin_launch(&mut s).is_err());
    }

    // ── Launch ─────────────────────────────────────────────────────────

    #[test]
    fn launch_requires_review_state() {
        let engine = engine();
        let mut s = session_for(CountryCode::Us);
        assert!(matches!(
            engine.begin_launch(&mut s),
            Err(TransitionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn failed_launch_is_provider_unreachable() {
        let engine = engine();
        let mut s = session_for(CountryCode::Us);
        engine.mark_ready(&mut s).unwrap();
        let created_at = s.created_at;
        engine
            .apply_risk(&mut s, &allow_assessment(created_at))
            .unwrap();
        engine.begin_launch(&mut s).unwrap();

        let now = Timestamp::new(1_733_000_100);
        let event = engine.fail_launch(&mut s, now).unwrap();
        assert_eq!(s.status, SessionStatus::Failed);
        assert_eq!(s.failure_reason, Some(FailureReason::ProviderUnreachable));
        assert_eq!(s.completed_at, Some(now));
        assert!(matches!(
            event,
            SessionEvent::Completed {
                status: SessionStatus::Failed,
                reason: Some(FailureReason::ProviderUnreachable),
                ..
            }
        ));
    }

    // ── Provider polling ───────────────────────────────────────────────

    #[test]
    fn processing_polls_then_verified_sets_completed_once() {
        let (engine, mut s) = processing_session();
        let attempt_count = s.attempt_count;

        for i in 0..3 {
            let event = engine
                .apply_provider_status(
                    &mut s,
                    ProviderStatus::Processing,
                    Timestamp::new(1_733_000_100 + i),
                )
                .unwrap();
            assert!(event.is_none());
            assert_eq!(s.status, SessionStatus::ProviderProcessing);
        }

        let verified_at = Timestamp::new(1_733_000_200);
        let event = engine
            .apply_provider_status(&mut s, ProviderStatus::Verified, verified_at)
            .unwrap()
            .unwrap();

        assert_eq!(s.status, SessionStatus::Verified);
        assert_eq!(s.completed_at, Some(verified_at));
        assert_eq!(s.attempt_count, attempt_count, "polls never bump attempts");
        assert!(matches!(
            event,
            SessionEvent::Completed {
                status: SessionStatus::Verified,
                reason: None,
                ..
            }
        ));

        // A further poll on the terminal session errors; completed_at is
        // untouched.
        let result =
            engine.apply_provider_status(&mut s, ProviderStatus::Verified, verified_at.plus_secs(60));
        assert!(matches!(result, Err(TransitionError::TerminalState { .. })));
        assert_eq!(s.completed_at, Some(verified_at));
    }

    #[test]
    fn requires_input_and_canceled_are_terminal() {
        for (status, expected) in [
            (ProviderStatus::RequiresInput, SessionStatus::RequiresInput),
            (ProviderStatus::Canceled, SessionStatus::Canceled),
        ] {
            let (engine, mut s) = processing_session();
            engine
                .apply_provider_status(&mut s, status, Timestamp::new(1_733_000_100))
                .unwrap();
            assert_eq!(s.status, expected);
            assert!(s.completed_at.is_some());
            assert!(s.failure_reason.is_none());
        }
    }

    #[test]
    fn expiry_during_processing_fails_with_reason() {
        let (engine, mut s) = processing_session();
        let past_expiry = s.expires_at.plus_secs(1);

        let event = engine
            .apply_provider_status(&mut s, ProviderStatus::Processing, past_expiry)
            .unwrap()
            .unwrap();
        assert_eq!(s.status, SessionStatus::Failed);
        assert_eq!(s.failure_reason, Some(FailureReason::Expired));
        assert!(matches!(
            event,
            SessionEvent::Completed {
                reason: Some(FailureReason::Expired),
                ..
            }
        ));
    }

    // ── Terminal immutability ──────────────────────────────────────────

    #[test]
    fn terminal_sessions_never_transition_again() {
        let (engine, mut s) = processing_session();
        engine
            .apply_provider_status(&mut s, ProviderStatus::Verified, Timestamp::new(1_733_000_100))
            .unwrap();

        assert!(engine.mark_ready(&mut s).is_err());
        assert!(engine
            .attach_context(&mut s, healthcare_attachment())
            .is_err());
        let created_at = s.created_at;
        let expiry = s.expires_at.plus_secs(10);
        assert!(engine
            .apply_risk(&mut s, &allow_assessment(created_at))
            .is_err());
        assert!(engine.begin_launch(&mut s).is_err());
        assert!(engine.cancel(&mut s, Timestamp::new(1_733_000_200)).is_err());
        assert!(engine
            .expire_if_due(&mut s, expiry)
            .is_none());
        assert_eq!(s.status, SessionStatus::Verified);
    }

    // ── Cancel and expiry sweep ────────────────────────────────────────

    #[test]
    fn cancel_any_non_terminal_state() {
        let engine = engine();
        let mut s = session_for(CountryCode::Us);
        let now = Timestamp::new(1_733_000_050);

        let event = engine.cancel(&mut s, now).unwrap();
        assert_eq!(s.status, SessionStatus::Canceled);
        assert_eq!(s.completed_at, Some(now));
        assert!(matches!(
            event,
            SessionEvent::Completed {
                status: SessionStatus::Canceled,
                ..
            }
        ));
    }

    #[test]
    fn expire_if_due_is_a_noop_before_deadline() {
        let engine = engine();
        let mut s = session_for(CountryCode::Us);
        let deadline = s.expires_at;
        assert!(engine.expire_if_due(&mut s, deadline).is_some());

        let mut fresh = session_for(CountryCode::Us);
        assert!(engine
            .expire_if_due(&mut fresh, Timestamp::new(1_733_000_001))
            .is_none());
        assert_eq!(fresh.status, SessionStatus::Created);
    }
}
