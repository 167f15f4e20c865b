//! The request-handling path.
//!
//! Each operation is invoked synchronously per request, loads session
//! state from the store, drives the state machine, and persists the
//! result — nothing survives in memory between invocations except the
//! launch guard and the sync queue. Calls to the identity provider and
//! the regional registries are the only suspension points and every one
//! of them carries a bounded timeout.

use crate::error::ServiceError;
use crate::metrics::ServiceMetrics;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tahaqq_provider::{IdentityProvider, ProviderCreateRequest, ProviderSession};
use tahaqq_regional::{GatewayOutcome, RegionalRegistry, ValidatorGateway};
use tahaqq_risk::{assess, BlockedReason};
use tahaqq_session::{LaunchGuard, SessionEngine, TransitionError};
use tahaqq_store::{
    AssessmentStore, AttemptStore, CachedSessionStore, SessionStore, StoreError, VerificationStore,
};
use tahaqq_sync::{ContextSnapshot, SyncHandle};
use tahaqq_types::{
    Clock, CountryCode, DeviceSignals, FailureReason, OidGenerator, OrchestrationParams,
    ProviderSessionId, RegionalAttachment, SessionOid, SessionStatus, Timestamp,
    VerificationSession, VerificationType,
};
use tracing::{info, warn};

/// A verification intent submitted by the operator UI/CLI.
#[derive(Clone, Debug)]
pub struct CreateSessionRequest {
    pub verification_type: VerificationType,
    pub country: CountryCode,
    pub return_url: String,
    /// Keys the attempt history; falls back to the device fingerprint.
    pub client_reference: Option<String>,
    pub regional_context: Option<RegionalAttachment>,
    pub device_signals: DeviceSignals,
    pub metadata: BTreeMap<String, String>,
}

/// Caller-facing projection of a session record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub oid: String,
    pub provider_session_id: Option<String>,
    pub verification_type: VerificationType,
    pub country: CountryCode,
    pub status: SessionStatus,
    pub failure_reason: Option<FailureReason>,
    pub risk_score: u8,
    pub attempt_count: u32,
    pub regional_context_kind: Option<String>,
    pub regional_validation_degraded: bool,
    pub created_at: u64,
    pub expires_at: u64,
    pub completed_at: Option<u64>,
}

impl From<&VerificationSession> for SessionView {
    fn from(session: &VerificationSession) -> Self {
        Self {
            oid: session.oid.to_string(),
            provider_session_id: session
                .provider_session_id
                .as_ref()
                .map(|id| id.to_string()),
            verification_type: session.verification_type,
            country: session.country.clone(),
            status: session.status,
            failure_reason: session.failure_reason,
            risk_score: session.risk_score,
            attempt_count: session.attempt_count,
            regional_context_kind: session
                .regional_attachment
                .as_ref()
                .map(|a| a.kind().to_string()),
            regional_validation_degraded: session.regional_validation_degraded,
            created_at: session.created_at.as_secs(),
            expires_at: session.expires_at.as_secs(),
            completed_at: session.completed_at.map(|t| t.as_secs()),
        }
    }
}

/// Result of a create call. A risk block is a 200-level business outcome,
/// not an error.
#[derive(Clone, Debug)]
pub enum CreateSessionOutcome {
    Launched {
        session: SessionView,
        hosted_url: String,
    },
    Blocked {
        session: SessionView,
        reason: BlockedReason,
        message: &'static str,
    },
}

pub struct VerificationService {
    engine: SessionEngine,
    oid_gen: OidGenerator,
    store: Arc<dyn VerificationStore>,
    cache: CachedSessionStore<dyn VerificationStore>,
    gateway: ValidatorGateway,
    provider: Arc<dyn IdentityProvider>,
    sync: SyncHandle,
    clock: Arc<dyn Clock>,
    launch_guard: Arc<LaunchGuard>,
    metrics: Arc<ServiceMetrics>,
}

impl VerificationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        params: OrchestrationParams,
        oid_base_arc: &str,
        store: Arc<dyn VerificationStore>,
        registry: Arc<dyn RegionalRegistry>,
        provider: Arc<dyn IdentityProvider>,
        sync: SyncHandle,
        clock: Arc<dyn Clock>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        let cache = CachedSessionStore::new(Arc::clone(&store), params.session_cache_ttl_secs);
        let gateway = ValidatorGateway::new(registry, params.registry_timeout_ms);
        Self {
            engine: SessionEngine::new(params),
            oid_gen: OidGenerator::new(oid_base_arc),
            store,
            cache,
            gateway,
            provider,
            sync,
            clock,
            launch_guard: LaunchGuard::new(),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    // ── Create ─────────────────────────────────────────────────────────

    /// Run one verification intent end to end: regional validation, risk
    /// scoring, provider hand-off, persistence, sync fan-out.
    pub async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CreateSessionOutcome, ServiceError> {
        validate_request(&request)?;
        let now = self.clock.now();
        let params = self.engine.params().clone();

        // Regional validation runs before anything is recorded: an
        // invalid code burns no attempt and creates no session.
        let mut context = request.regional_context;
        let mut degraded = false;
        if let Some(attachment) = context.as_mut() {
            match self.gateway.validate(&request.country, attachment).await {
                GatewayOutcome::Invalid { reason } => {
                    return Err(ServiceError::Validation(reason.to_string()));
                }
                GatewayOutcome::Degraded { .. } => {
                    degraded = true;
                    self.metrics.degraded_validations.inc();
                }
                GatewayOutcome::Valid => {}
            }
        }

        // Attempt history for the session key, recorded before scoring so
        // the scorer sees the attempt it is assessing.
        let session_key = request
            .client_reference
            .clone()
            .unwrap_or_else(|| request.device_signals.fingerprint.to_string());
        let mut history = self.store.get_history(&session_key)?;
        history.record_attempt(
            &request.device_signals.fingerprint,
            now,
            params.risk.burst_window_secs,
        );
        self.store.put_history(&session_key, &history)?;

        let oid = self.oid_gen.next(&request.country, now);
        let mut session = VerificationSession::new(
            oid.clone(),
            request.verification_type,
            request.country.clone(),
            request.return_url.clone(),
            request.metadata.clone(),
            params.max_attempts,
            now,
            params.session_ttl_secs,
        );
        session.attempt_count = history.attempt_count;

        if let Some(attachment) = context {
            self.engine.attach_context(&mut session, attachment)?;
            self.engine.complete_context(&mut session, degraded)?;
        } else {
            self.engine.mark_ready(&mut session)?;
        }

        let assessment = assess(
            &history,
            &request.device_signals,
            params.max_attempts,
            &params.risk,
            now,
        );
        self.store.append_assessment(&oid, &assessment)?;
        self.metrics
            .risk_score
            .observe(assessment.aggregate_risk_score as f64);

        self.engine.apply_risk(&mut session, &assessment)?;
        let mut session = self.cache.put_session(&session, now)?;

        if let Some(reason) = assessment.blocked_reason {
            warn!(
                oid = %session.oid,
                score = assessment.aggregate_risk_score,
                reason = %reason,
                "session creation blocked by risk scoring"
            );
            self.metrics.sessions_blocked.inc();
            self.dispatch_snapshot(&session, now);
            return Ok(CreateSessionOutcome::Blocked {
                session: SessionView::from(&session),
                reason,
                message: reason.message(),
            });
        }

        // Launch: one in-flight transition per OID, provider call retried
        // once with backoff, failure folded into the session as terminal.
        let _permit = self.launch_guard.acquire(&session.oid)?;
        self.engine.begin_launch(&mut session)?;
        session = self.cache.put_session(&session, now)?;

        let provider_request = ProviderCreateRequest {
            verification_type: request.verification_type,
            return_url: request.return_url,
            metadata: request.metadata,
        };
        match self.call_provider_create(&provider_request).await {
            Ok(provider_session) => {
                self.engine
                    .complete_launch(&mut session, provider_session.id.clone())?;
                let session = self.cache.put_session(&session, now)?;
                self.metrics.sessions_created.inc();
                self.metrics.processing_sessions.inc();
                info!(
                    oid = %session.oid,
                    provider_session = %provider_session.id,
                    country = %session.country,
                    "verification session launched"
                );
                self.dispatch_snapshot(&session, now);
                Ok(CreateSessionOutcome::Launched {
                    session: SessionView::from(&session),
                    hosted_url: provider_session.hosted_url,
                })
            }
            Err(message) => {
                self.engine.fail_launch(&mut session, now)?;
                let session = self.cache.put_session(&session, now)?;
                self.metrics.provider_failures.inc();
                warn!(oid = %session.oid, error = %message, "provider launch failed");
                self.dispatch_snapshot(&session, now);
                Err(ServiceError::ProviderUnavailable(message))
            }
        }
    }

    /// One provider-create attempt plus a single backoff retry.
    async fn call_provider_create(
        &self,
        request: &ProviderCreateRequest,
    ) -> Result<ProviderSession, String> {
        let params = self.engine.params();
        match self.timed_provider_create(request).await {
            Ok(session) => Ok(session),
            Err(first) => {
                tokio::time::sleep(Duration::from_millis(params.provider_retry_backoff_ms)).await;
                self.timed_provider_create(request)
                    .await
                    .map_err(|second| format!("{first}; retry: {second}"))
            }
        }
    }

    async fn timed_provider_create(
        &self,
        request: &ProviderCreateRequest,
    ) -> Result<ProviderSession, String> {
        let budget = Duration::from_millis(self.engine.params().provider_timeout_ms);
        let started = Instant::now();
        let result = tokio::time::timeout(budget, self.provider.create_session(request)).await;
        self.metrics
            .provider_latency_ms
            .observe(started.elapsed().as_millis() as f64);
        match result {
            Ok(Ok(session)) => Ok(session),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("provider call timed out".to_string()),
        }
    }

    // ── Status ─────────────────────────────────────────────────────────

    /// Merged view of provider status + stored risk/context. Refreshes
    /// the provider status while the session is still processing.
    pub async fn get_session_status(&self, provider_id: &str) -> Result<SessionView, ServiceError> {
        let now = self.clock.now();
        let id = ProviderSessionId::new(provider_id);
        let mut session = match self.cache.get_by_provider_id(&id, now) {
            Ok(session) => session,
            Err(StoreError::NotFound(key)) => return Err(ServiceError::NotFound(key)),
            Err(e) => return Err(e.into()),
        };

        if session.is_terminal() || session.status != SessionStatus::ProviderProcessing {
            return Ok(SessionView::from(&session));
        }

        // Deadline first: an expired session fails without a provider call.
        if let Some(event) = self.engine.expire_if_due(&mut session, now) {
            let session = self.cache.put_session(&session, now)?;
            self.metrics.processing_sessions.dec();
            self.note_expired(&event);
            self.dispatch_snapshot(&session, now);
            return Ok(SessionView::from(&session));
        }

        let budget = Duration::from_millis(self.engine.params().provider_timeout_ms);
        let status = match tokio::time::timeout(budget, self.provider.fetch_status(&id)).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(ServiceError::ProviderUnavailable(e.to_string())),
            Err(_) => {
                return Err(ServiceError::ProviderUnavailable(
                    "provider status poll timed out".to_string(),
                ))
            }
        };

        match self.engine.apply_provider_status(&mut session, status, now)? {
            // Still processing: nothing changed, nothing to persist.
            None => Ok(SessionView::from(&session)),
            Some(event) => {
                let session = self.cache.put_session(&session, now)?;
                self.metrics.processing_sessions.dec();
                self.note_expired(&event);
                info!(oid = %session.oid, status = %session.status, "session reached terminal state");
                self.dispatch_snapshot(&session, now);
                Ok(SessionView::from(&session))
            }
        }
    }

    // ── Regional context ───────────────────────────────────────────────

    /// Attach or replace regional context on a session that has not yet
    /// launched. Validates synchronously against the registry.
    pub async fn attach_context(
        &self,
        oid: &str,
        mut attachment: RegionalAttachment,
    ) -> Result<SessionView, ServiceError> {
        let oid = parse_oid(oid)?;
        let now = self.clock.now();
        let mut session = match self.cache.get_by_oid(&oid, now) {
            Ok(session) => session,
            Err(StoreError::NotFound(key)) => return Err(ServiceError::NotFound(key)),
            Err(e) => return Err(e.into()),
        };

        // Cheap state checks before spending a registry call.
        if session.is_terminal() {
            return Err(TransitionError::TerminalState {
                oid: session.oid.to_string(),
                status: session.status,
            }
            .into());
        }
        if matches!(
            session.status,
            SessionStatus::Launching | SessionStatus::ProviderProcessing
        ) {
            return Err(TransitionError::ContextLocked.into());
        }

        let degraded = match self.gateway.validate(&session.country, &mut attachment).await {
            GatewayOutcome::Invalid { reason } => {
                return Err(ServiceError::Validation(reason.to_string()));
            }
            GatewayOutcome::Degraded { .. } => {
                self.metrics.degraded_validations.inc();
                true
            }
            GatewayOutcome::Valid => false,
        };

        self.engine.attach_context(&mut session, attachment)?;
        self.engine.complete_context(&mut session, degraded)?;
        let session = self.cache.put_session(&session, now)?;
        self.dispatch_snapshot(&session, now);
        Ok(SessionView::from(&session))
    }

    // ── Cancel / reporting / expiry ────────────────────────────────────

    /// Operator cancel of a non-terminal session.
    pub fn cancel_session(&self, oid: &str) -> Result<SessionView, ServiceError> {
        let oid = parse_oid(oid)?;
        let now = self.clock.now();
        let mut session = match self.cache.get_by_oid(&oid, now) {
            Ok(session) => session,
            Err(StoreError::NotFound(key)) => return Err(ServiceError::NotFound(key)),
            Err(e) => return Err(e.into()),
        };

        let was_processing = session.status == SessionStatus::ProviderProcessing;
        self.engine.cancel(&mut session, now)?;
        let session = self.cache.put_session(&session, now)?;
        if was_processing {
            self.metrics.processing_sessions.dec();
        }
        info!(oid = %session.oid, "session canceled by operator");
        self.dispatch_snapshot(&session, now);
        Ok(SessionView::from(&session))
    }

    /// Reporting: sessions for one country created within `[from, to)`.
    pub fn list_sessions(
        &self,
        country: &CountryCode,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<SessionView>, ServiceError> {
        let sessions = self.store.list_by_country_and_range(country, from, to)?;
        Ok(sessions.iter().map(SessionView::from).collect())
    }

    /// Fail every non-terminal session past its deadline. Returns how
    /// many were expired. Intended for a periodic task.
    pub fn expire_due_sessions(&self) -> Result<usize, ServiceError> {
        let now = self.clock.now();
        let mut expired = 0;
        for mut session in self.store.list_non_terminal()? {
            let was_processing = session.status == SessionStatus::ProviderProcessing;
            if self.engine.expire_if_due(&mut session, now).is_some() {
                let session = self.cache.put_session(&session, now)?;
                self.metrics.sessions_expired.inc();
                if was_processing {
                    self.metrics.processing_sessions.dec();
                }
                self.dispatch_snapshot(&session, now);
                expired += 1;
            }
        }
        if expired > 0 {
            info!(expired, "expiry sweep failed overdue sessions");
        }
        Ok(expired)
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn dispatch_snapshot(&self, session: &VerificationSession, now: Timestamp) {
        if !self.sync.dispatch(ContextSnapshot::capture(session, now)) {
            self.metrics.sync_dropped.inc();
        }
    }

    fn note_expired(&self, event: &tahaqq_session::SessionEvent) {
        if let tahaqq_session::SessionEvent::Completed {
            reason: Some(FailureReason::Expired),
            ..
        } = event
        {
            self.metrics.sessions_expired.inc();
        }
    }
}

fn validate_request(request: &CreateSessionRequest) -> Result<(), ServiceError> {
    if !request.return_url.starts_with("http://") && !request.return_url.starts_with("https://") {
        return Err(ServiceError::Validation(
            "return_url must be an absolute http(s) URL".to_string(),
        ));
    }
    if request.device_signals.fingerprint.as_str().is_empty() {
        return Err(ServiceError::Validation(
            "device fingerprint is required".to_string(),
        ));
    }
    Ok(())
}

fn parse_oid(raw: &str) -> Result<SessionOid, ServiceError> {
    SessionOid::parse(raw).map_err(|e| ServiceError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tahaqq_nullables::{NullClock, NullProvider, NullRegistry, NullTransport};
    use tahaqq_provider::ProviderStatus;
    use tahaqq_store::MemoryStore;
    use tahaqq_sync::NeuralDispatcher;
    use tahaqq_types::{CitizenshipStatus, DeviceFingerprint, InsuranceStatus};

    const EPOCH: u64 = 1_733_000_000;

    struct Harness {
        service: VerificationService,
        provider: Arc<NullProvider>,
        registry: Arc<NullRegistry>,
        transport: Arc<NullTransport>,
        clock: Arc<NullClock>,
        store: Arc<MemoryStore>,
        dispatcher: NeuralDispatcher,
    }

    fn harness() -> Harness {
        let provider = NullProvider::new();
        let registry = NullRegistry::seeded();
        let transport = NullTransport::new();
        let clock = NullClock::new(EPOCH);
        let store = Arc::new(MemoryStore::new());
        let dispatcher = NeuralDispatcher::spawn(transport.clone(), 3, 250);

        let service = VerificationService::new(
            OrchestrationParams::standard(),
            tahaqq_types::oid::DEFAULT_BASE_ARC,
            store.clone(),
            registry.clone(),
            provider.clone(),
            dispatcher.handle(),
            clock.clone(),
            Arc::new(ServiceMetrics::new()),
        );

        Harness {
            service,
            provider,
            registry,
            transport,
            clock,
            store,
            dispatcher,
        }
    }

    fn signals(fp: &str) -> DeviceSignals {
        DeviceSignals::clean(DeviceFingerprint::from_hash(fp))
    }

    fn request(country: CountryCode, reference: &str, fp: &str) -> CreateSessionRequest {
        CreateSessionRequest {
            verification_type: VerificationType::Document,
            country,
            return_url: "https://operator.example/return".into(),
            client_reference: Some(reference.to_string()),
            regional_context: None,
            device_signals: signals(fp),
            metadata: BTreeMap::new(),
        }
    }

    fn sa_request(facility: Option<&str>, reference: &str, fp: &str) -> CreateSessionRequest {
        let mut req = request(CountryCode::Sa, reference, fp);
        req.regional_context = Some(RegionalAttachment::Healthcare {
            nphies_id: "NPH-1".into(),
            facility_code: facility.map(String::from),
            practitioner_id: None,
            insurance_status: InsuranceStatus::Active,
            is_valid: false,
        });
        req
    }

    fn sd_request(wilaya: &str, reference: &str, fp: &str) -> CreateSessionRequest {
        let mut req = request(CountryCode::Sd, reference, fp);
        req.verification_type = VerificationType::IdNumber;
        req.regional_context = Some(RegionalAttachment::NationalId {
            national_id: "199-1".into(),
            wilaya_code: wilaya.into(),
            ministry_code: None,
            ministry_access: BTreeSet::new(),
            citizenship_status: CitizenshipStatus::Citizen,
            is_valid: false,
        });
        req
    }

    fn launched(outcome: CreateSessionOutcome) -> (SessionView, String) {
        match outcome {
            CreateSessionOutcome::Launched {
                session,
                hosted_url,
            } => (session, hosted_url),
            CreateSessionOutcome::Blocked { session, .. } => {
                panic!("expected launch, got block: {session:?}")
            }
        }
    }

    // ── Create ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn sa_session_with_active_facility_launches_clean() {
        let h = harness();
        let outcome = h
            .service
            .create_session(sa_request(Some("KSA001"), "ref-1", "device-1"))
            .await
            .unwrap();

        let (view, hosted_url) = launched(outcome);
        assert_eq!(view.status, SessionStatus::ProviderProcessing);
        assert_eq!(view.risk_score, 0);
        assert_eq!(view.attempt_count, 1);
        assert!(!view.regional_validation_degraded);
        assert_eq!(view.regional_context_kind.as_deref(), Some("healthcare"));
        assert!(view.oid.contains(".682."), "OID carries the SA arc");
        assert!(hosted_url.starts_with("https://verify.null/start/"));
        assert_eq!(h.provider.create_calls(), 1);

        // Persisted and reachable through the provider id.
        let stored = h
            .service
            .get_session_status(view.provider_session_id.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(stored.oid, view.oid);
        assert_eq!(h.service.metrics().processing_sessions.get(), 1);
    }

    #[tokio::test]
    async fn plain_country_skips_registry_entirely() {
        let h = harness();
        h.service
            .create_session(request(CountryCode::Us, "ref-1", "device-1"))
            .await
            .unwrap();
        assert_eq!(h.registry.lookup_count(), 0);
    }

    #[tokio::test]
    async fn fourth_rapid_attempt_blocks_with_high_fraud_risk() {
        let h = harness();
        for _ in 0..3 {
            let outcome = h
                .service
                .create_session(request(CountryCode::Us, "burst-ref", "device-1"))
                .await
                .unwrap();
            assert!(matches!(outcome, CreateSessionOutcome::Launched { .. }));
        }

        let outcome = h
            .service
            .create_session(request(CountryCode::Us, "burst-ref", "device-1"))
            .await
            .unwrap();
        match outcome {
            CreateSessionOutcome::Blocked {
                session,
                reason,
                message,
            } => {
                assert_eq!(session.risk_score, 100);
                assert_eq!(session.status, SessionStatus::Failed);
                assert_eq!(session.failure_reason, Some(FailureReason::RiskBlocked));
                assert_eq!(reason, BlockedReason::HighFraudRisk);
                assert_eq!(message, "High fraud risk detected");
            }
            CreateSessionOutcome::Launched { .. } => panic!("4th rapid attempt must block"),
        }

        // No provider call for the blocked attempt.
        assert_eq!(h.provider.create_calls(), 3);
        assert_eq!(h.service.metrics().sessions_blocked.get(), 1);
    }

    #[tokio::test]
    async fn unknown_wilaya_rejects_before_any_side_effect() {
        let h = harness();
        let result = h
            .service
            .create_session(sd_request("SD99", "ref-1", "device-1"))
            .await;

        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert_eq!(h.provider.create_calls(), 0);
        // No attempt burned, no session persisted.
        assert_eq!(h.store.get_history("ref-1").unwrap().attempt_count, 0);
        assert!(h
            .store
            .list_by_country_and_range(
                &CountryCode::Sd,
                Timestamp::new(0),
                Timestamp::new(u64::MAX)
            )
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn registry_outage_degrades_but_still_launches() {
        let h = harness();
        h.registry.set_unavailable(true);

        let outcome = h
            .service
            .create_session(sd_request("SD01", "ref-1", "device-1"))
            .await
            .unwrap();
        let (view, _) = launched(outcome);
        assert_eq!(view.status, SessionStatus::ProviderProcessing);
        assert!(view.regional_validation_degraded);
        assert_eq!(h.service.metrics().degraded_validations.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_registry_degrades_within_timeout_budget() {
        let h = harness();
        h.registry.set_latency_ms(60_000);

        let outcome = h
            .service
            .create_session(sd_request("SD01", "ref-1", "device-1"))
            .await
            .unwrap();
        let (view, _) = launched(outcome);
        assert!(view.regional_validation_degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn provider_outage_fails_session_after_single_retry() {
        let h = harness();
        h.provider.fail_next_creates(2);

        let result = h
            .service
            .create_session(request(CountryCode::Us, "ref-1", "device-1"))
            .await;
        assert!(matches!(result, Err(ServiceError::ProviderUnavailable(_))));
        assert_eq!(h.provider.create_calls(), 2, "exactly one retry");

        let stored = h
            .store
            .list_by_country_and_range(
                &CountryCode::Us,
                Timestamp::new(0),
                Timestamp::new(u64::MAX),
            )
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, SessionStatus::Failed);
        assert_eq!(
            stored[0].failure_reason,
            Some(FailureReason::ProviderUnreachable)
        );
        assert_eq!(h.service.metrics().provider_failures.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn provider_retry_recovers_from_one_failure() {
        let h = harness();
        h.provider.fail_next_creates(1);

        let outcome = h
            .service
            .create_session(request(CountryCode::Us, "ref-1", "device-1"))
            .await
            .unwrap();
        assert!(matches!(outcome, CreateSessionOutcome::Launched { .. }));
        assert_eq!(h.provider.create_calls(), 2);
    }

    #[tokio::test]
    async fn malformed_return_url_is_rejected_up_front() {
        let h = harness();
        let mut req = request(CountryCode::Us, "ref-1", "device-1");
        req.return_url = "ftp://operator.example".into();

        assert!(matches!(
            h.service.create_session(req).await,
            Err(ServiceError::Validation(_))
        ));
        assert_eq!(h.provider.create_calls(), 0);
    }

    // ── Status polling ─────────────────────────────────────────────────

    #[tokio::test]
    async fn processing_polls_then_verified_completes_once() {
        let h = harness();
        let (view, _) = launched(
            h.service
                .create_session(request(CountryCode::Us, "ref-1", "device-1"))
                .await
                .unwrap(),
        );
        let provider_id = view.provider_session_id.unwrap();
        h.provider.script_statuses(
            &ProviderSessionId::new(provider_id.as_str()),
            vec![
                ProviderStatus::Processing,
                ProviderStatus::Processing,
                ProviderStatus::Processing,
                ProviderStatus::Verified,
            ],
        );

        for _ in 0..3 {
            let polled = h.service.get_session_status(&provider_id).await.unwrap();
            assert_eq!(polled.status, SessionStatus::ProviderProcessing);
            assert!(polled.completed_at.is_none());
            assert_eq!(polled.attempt_count, 1, "polls never bump attempts");
        }

        let done = h.service.get_session_status(&provider_id).await.unwrap();
        assert_eq!(done.status, SessionStatus::Verified);
        let completed_at = done.completed_at.expect("completed_at set");
        assert_eq!(h.service.metrics().processing_sessions.get(), 0);

        // A further poll serves the stored terminal view without another
        // provider call, and completed_at does not move.
        let calls_before = h.provider.status_calls();
        let again = h.service.get_session_status(&provider_id).await.unwrap();
        assert_eq!(again.status, SessionStatus::Verified);
        assert_eq!(again.completed_at, Some(completed_at));
        assert_eq!(h.provider.status_calls(), calls_before);
    }

    #[tokio::test]
    async fn unknown_provider_session_is_not_found() {
        let h = harness();
        assert!(matches!(
            h.service.get_session_status("vs_ghost").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn session_expires_during_processing_poll() {
        let h = harness();
        let (view, _) = launched(
            h.service
                .create_session(request(CountryCode::Us, "ref-1", "device-1"))
                .await
                .unwrap(),
        );
        let provider_id = view.provider_session_id.unwrap();

        h.clock
            .advance(OrchestrationParams::standard().session_ttl_secs + 1);
        let status_calls = h.provider.status_calls();
        let polled = h.service.get_session_status(&provider_id).await.unwrap();

        assert_eq!(polled.status, SessionStatus::Failed);
        assert_eq!(polled.failure_reason, Some(FailureReason::Expired));
        assert_eq!(
            h.provider.status_calls(),
            status_calls,
            "expired sessions fail without a provider call"
        );
        assert_eq!(h.service.metrics().sessions_expired.get(), 1);
    }

    // ── Regional context attach ────────────────────────────────────────

    /// Seed a pre-launch session directly, the state a session is in
    /// between intake and launch.
    fn seed_created_session(h: &Harness, country: CountryCode) -> SessionOid {
        let oid = SessionOid::assemble(
            tahaqq_types::oid::DEFAULT_BASE_ARC,
            &country,
            Timestamp::new(EPOCH),
            999,
        );
        let session = VerificationSession::new(
            oid.clone(),
            VerificationType::IdNumber,
            country,
            "https://operator.example/return".into(),
            BTreeMap::new(),
            3,
            Timestamp::new(EPOCH),
            86_400,
        );
        h.store.put_session(&session).unwrap();
        oid
    }

    #[tokio::test]
    async fn attach_context_validates_and_persists() {
        let h = harness();
        let oid = seed_created_session(&h, CountryCode::Sd);

        let attachment = RegionalAttachment::NationalId {
            national_id: "199-1".into(),
            wilaya_code: "sd01".into(),
            ministry_code: Some("MOH".into()),
            ministry_access: BTreeSet::new(),
            citizenship_status: CitizenshipStatus::Resident,
            is_valid: false,
        };
        let view = h
            .service
            .attach_context(oid.as_str(), attachment)
            .await
            .unwrap();

        assert_eq!(view.status, SessionStatus::ReadyForReview);
        assert_eq!(view.regional_context_kind.as_deref(), Some("national_id"));
        assert!(!view.regional_validation_degraded);

        let stored = h.store.get_by_oid(&oid).unwrap();
        assert!(stored.regional_attachment.as_ref().unwrap().is_valid());
    }

    #[tokio::test]
    async fn attach_context_with_unknown_code_is_400() {
        let h = harness();
        let oid = seed_created_session(&h, CountryCode::Sd);

        let attachment = RegionalAttachment::NationalId {
            national_id: "199-1".into(),
            wilaya_code: "SD99".into(),
            ministry_code: None,
            ministry_access: BTreeSet::new(),
            citizenship_status: CitizenshipStatus::Citizen,
            is_valid: false,
        };
        assert!(matches!(
            h.service.attach_context(oid.as_str(), attachment).await,
            Err(ServiceError::Validation(_))
        ));

        // The stored session is untouched.
        let stored = h.store.get_by_oid(&oid).unwrap();
        assert_eq!(stored.status, SessionStatus::Created);
        assert!(stored.regional_attachment.is_none());
    }

    #[tokio::test]
    async fn attach_context_after_launch_conflicts() {
        let h = harness();
        let (view, _) = launched(
            h.service
                .create_session(sd_request("SD01", "ref-1", "device-1"))
                .await
                .unwrap(),
        );

        let attachment = RegionalAttachment::NationalId {
            national_id: "199-2".into(),
            wilaya_code: "SD01".into(),
            ministry_code: None,
            ministry_access: BTreeSet::new(),
            citizenship_status: CitizenshipStatus::Citizen,
            is_valid: false,
        };
        let result = h.service.attach_context(&view.oid, attachment).await;
        assert!(matches!(
            result,
            Err(ServiceError::Transition(TransitionError::ContextLocked))
        ));
    }

    // ── Cancel, list, expiry sweep ─────────────────────────────────────

    #[tokio::test]
    async fn cancel_is_terminal_and_idempotence_is_rejected() {
        let h = harness();
        let (view, _) = launched(
            h.service
                .create_session(request(CountryCode::Us, "ref-1", "device-1"))
                .await
                .unwrap(),
        );

        let canceled = h.service.cancel_session(&view.oid).unwrap();
        assert_eq!(canceled.status, SessionStatus::Canceled);
        assert!(canceled.completed_at.is_some());
        assert_eq!(h.service.metrics().processing_sessions.get(), 0);

        assert!(matches!(
            h.service.cancel_session(&view.oid),
            Err(ServiceError::Transition(TransitionError::TerminalState { .. }))
        ));
    }

    #[tokio::test]
    async fn list_sessions_filters_by_country_and_range() {
        let h = harness();
        for (i, reference) in ["a", "b"].iter().enumerate() {
            h.clock.set(EPOCH + i as u64 * 100);
            h.service
                .create_session(sa_request(Some("KSA001"), reference, "device-1"))
                .await
                .unwrap();
        }
        h.clock.set(EPOCH + 200);
        h.service
            .create_session(sd_request("SD01", "c", "device-1"))
            .await
            .unwrap();

        let listed = h
            .service
            .list_sessions(
                &CountryCode::Sa,
                Timestamp::new(EPOCH),
                Timestamp::new(EPOCH + 150),
            )
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|v| v.country == CountryCode::Sa));
    }

    #[tokio::test]
    async fn expiry_sweep_fails_overdue_sessions() {
        let h = harness();
        h.service
            .create_session(request(CountryCode::Us, "ref-1", "device-1"))
            .await
            .unwrap();
        h.service
            .create_session(request(CountryCode::Us, "ref-2", "device-2"))
            .await
            .unwrap();

        assert_eq!(h.service.expire_due_sessions().unwrap(), 0);

        h.clock
            .advance(OrchestrationParams::standard().session_ttl_secs + 1);
        assert_eq!(h.service.expire_due_sessions().unwrap(), 2);
        assert_eq!(h.service.metrics().sessions_expired.get(), 2);
        assert_eq!(h.service.metrics().processing_sessions.get(), 0);

        // Terminal now; a second sweep finds nothing.
        assert_eq!(h.service.expire_due_sessions().unwrap(), 0);
    }

    // ── Neural sync fan-out ────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn lifecycle_snapshots_reach_the_sync_channel() {
        let h = harness();
        let (view, _) = launched(
            h.service
                .create_session(request(CountryCode::Us, "ref-1", "device-1"))
                .await
                .unwrap(),
        );
        let provider_id = view.provider_session_id.clone().unwrap();
        h.provider.script_statuses(
            &ProviderSessionId::new(provider_id.as_str()),
            vec![ProviderStatus::Verified],
        );
        h.service.get_session_status(&provider_id).await.unwrap();

        let Harness {
            service,
            transport,
            dispatcher,
            ..
        } = h;
        drop(service);
        dispatcher.shutdown().await;

        let delivered = transport.delivered();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].status, SessionStatus::ProviderProcessing);
        assert_eq!(delivered[1].status, SessionStatus::Verified);
        assert_eq!(delivered[0].oid.to_string(), view.oid);
    }

    #[tokio::test(start_paused = true)]
    async fn sync_outage_never_fails_the_session() {
        let h = harness();
        h.transport.fail_next(u32::MAX);

        let outcome = h
            .service
            .create_session(request(CountryCode::Us, "ref-1", "device-1"))
            .await
            .unwrap();
        assert!(matches!(outcome, CreateSessionOutcome::Launched { .. }));

        let Harness {
            service,
            transport,
            dispatcher,
            ..
        } = h;
        drop(service);
        dispatcher.shutdown().await;
        assert_eq!(transport.delivered_count(), 0);
    }
}
