//! Orchestration parameters — every tunable the platform consults.
//!
//! Risk weights and the block threshold are configuration, not policy
//! baked into code; the defaults below are the platform's standard
//! operating values.

use serde::{Deserialize, Serialize};

/// Risk-scoring weights and thresholds. All scores are additive and the
/// aggregate is clamped to [0, 100].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskParams {
    /// Added when `attempt_count` exceeds the session's `max_attempts`.
    pub over_attempts_weight: u8,

    /// Added when the previous attempt was less than `burst_window_secs` ago.
    pub burst_weight: u8,

    /// Replay/burst window in seconds.
    pub burst_window_secs: u64,

    /// Added when the device fingerprint differs from the one recorded at
    /// session start.
    pub fingerprint_mismatch_weight: u8,

    /// Added for headless-browser markers.
    pub headless_weight: u8,

    /// Added for an automation-tooling signature.
    pub tooling_weight: u8,

    /// Aggregate cap for the automation category (headless + tooling).
    pub automation_cap: u8,

    /// Added on geo mismatch (stub signal, defaults to absent).
    pub geo_mismatch_weight: u8,

    /// Added on VPN/proxy detection (stub signal, defaults to absent).
    pub vpn_weight: u8,

    /// Block when the aggregate reaches this value.
    pub block_threshold: u8,

    /// Aggregate at or above this reads as "High fraud risk detected".
    pub high_risk_threshold: u8,

    /// Aggregate at or above this reads as "Multiple failed attempts".
    pub elevated_risk_threshold: u8,
}

impl RiskParams {
    pub fn standard() -> Self {
        Self {
            over_attempts_weight: 50,
            burst_weight: 30,
            burst_window_secs: 5,
            fingerprint_mismatch_weight: 40,
            headless_weight: 50,
            tooling_weight: 50,
            automation_cap: 100,
            geo_mismatch_weight: 20,
            vpn_weight: 25,
            block_threshold: 70,
            high_risk_threshold: 90,
            elevated_risk_threshold: 50,
        }
    }
}

impl Default for RiskParams {
    fn default() -> Self {
        Self::standard()
    }
}

/// All orchestration tunables: risk policy, attempt ceiling, timeouts,
/// retry budgets, and cache TTLs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationParams {
    #[serde(default)]
    pub risk: RiskParams,

    /// Attempt ceiling per session key; exceeding it is a risk penalty.
    pub max_attempts: u32,

    /// Session lifetime from creation to `expires_at`.
    pub session_ttl_secs: u64,

    /// Budget for one regional registry lookup. A timeout degrades the
    /// validation rather than blocking session creation.
    pub registry_timeout_ms: u64,

    /// Budget for one identity-provider call.
    pub provider_timeout_ms: u64,

    /// Backoff before the single provider-create retry.
    pub provider_retry_backoff_ms: u64,

    /// Delivery attempts for one neural-sync snapshot.
    pub sync_max_attempts: u32,

    /// Initial backoff between sync delivery attempts (doubles per retry).
    pub sync_backoff_ms: u64,

    /// Cache TTL for session-status reads (volatile).
    pub session_cache_ttl_secs: u64,

    /// Cache TTL for reference-style reads (stable).
    pub reference_cache_ttl_secs: u64,
}

impl OrchestrationParams {
    /// Standard operating values.
    pub fn standard() -> Self {
        Self {
            risk: RiskParams::standard(),
            max_attempts: 3,
            session_ttl_secs: 24 * 3600,
            registry_timeout_ms: 5_000,
            provider_timeout_ms: 10_000,
            provider_retry_backoff_ms: 250,
            sync_max_attempts: 3,
            sync_backoff_ms: 250,
            session_cache_ttl_secs: 5 * 60,
            reference_cache_ttl_secs: 3600,
        }
    }
}

impl Default for OrchestrationParams {
    fn default() -> Self {
        Self::standard()
    }
}
