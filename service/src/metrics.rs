//! Prometheus metrics for the verification service.
//!
//! The [`ServiceMetrics`] struct owns a dedicated [`Registry`] that the
//! HTTP `/metrics` endpoint encodes into the text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

/// Central collection of service-level Prometheus metrics.
pub struct ServiceMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Sessions that reached the provider and started processing.
    pub sessions_created: IntCounter,
    /// Session-creation attempts blocked by the risk scorer.
    pub sessions_blocked: IntCounter,
    /// Provider calls that failed after the retry budget.
    pub provider_failures: IntCounter,
    /// Regional validations that completed degraded.
    pub degraded_validations: IntCounter,
    /// Sessions failed by the expiry deadline.
    pub sessions_expired: IntCounter,
    /// Sync snapshots dropped at submission (queue full or stopped).
    pub sync_dropped: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Sessions currently in provider processing.
    pub processing_sessions: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Aggregate risk score distribution per assessment.
    pub risk_score: Histogram,
    /// Identity-provider call latency in milliseconds.
    pub provider_latency_ms: Histogram,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let sessions_created = register_int_counter_with_registry!(
            Opts::new("tahaqq_sessions_created_total", "Sessions handed to the provider"),
            registry
        )
        .expect("register sessions_created");

        let sessions_blocked = register_int_counter_with_registry!(
            Opts::new("tahaqq_sessions_blocked_total", "Attempts blocked by risk scoring"),
            registry
        )
        .expect("register sessions_blocked");

        let provider_failures = register_int_counter_with_registry!(
            Opts::new(
                "tahaqq_provider_failures_total",
                "Provider calls failed after retries"
            ),
            registry
        )
        .expect("register provider_failures");

        let degraded_validations = register_int_counter_with_registry!(
            Opts::new(
                "tahaqq_degraded_validations_total",
                "Regional validations completed degraded"
            ),
            registry
        )
        .expect("register degraded_validations");

        let sessions_expired = register_int_counter_with_registry!(
            Opts::new("tahaqq_sessions_expired_total", "Sessions failed at expiry"),
            registry
        )
        .expect("register sessions_expired");

        let sync_dropped = register_int_counter_with_registry!(
            Opts::new("tahaqq_sync_dropped_total", "Sync snapshots dropped at submission"),
            registry
        )
        .expect("register sync_dropped");

        let processing_sessions = register_int_gauge_with_registry!(
            Opts::new(
                "tahaqq_processing_sessions",
                "Sessions currently in provider processing"
            ),
            registry
        )
        .expect("register processing_sessions");

        let risk_score = register_histogram_with_registry!(
            HistogramOpts::new("tahaqq_risk_score", "Aggregate risk score per assessment")
                .buckets(vec![0.0, 10.0, 30.0, 50.0, 70.0, 90.0, 100.0]),
            registry
        )
        .expect("register risk_score");

        let provider_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "tahaqq_provider_latency_ms",
                "Identity provider call latency (ms)"
            )
            .buckets(vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0, 10000.0]),
            registry
        )
        .expect("register provider_latency_ms");

        Self {
            registry,
            sessions_created,
            sessions_blocked,
            provider_failures,
            degraded_validations,
            sessions_expired,
            sync_dropped,
            processing_sessions,
            risk_score,
            provider_latency_ms,
        }
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if encoder
            .encode(&self.registry.gather(), &mut buffer)
            .is_err()
        {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}
