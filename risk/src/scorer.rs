//! The scoring function.
//!
//! Category contributions:
//! - attempt frequency: over-ceiling weight, plus the burst weight once per
//!   consecutive rapid attempt (a sustained burst escalates, a single quick
//!   retry scores the base weight)
//! - device consistency: fingerprint drift from the session-start baseline
//! - automation: headless markers and tooling signature, capped as a category
//! - context: geo mismatch and VPN detection, both stub signals today
//!
//! The aggregate is clamped to [0, 100] and compared against the block
//! threshold. No randomness, no I/O, no clock reads — `now` is an argument.

use crate::assessment::{BlockedReason, RiskAssessment, RiskDecision};
use crate::history::AttemptHistory;
use tahaqq_types::{DeviceSignals, RiskParams, Timestamp};

/// Score one session-creation attempt.
///
/// `history` must already include the attempt being assessed (see
/// [`AttemptHistory::record_attempt`]).
pub fn assess(
    history: &AttemptHistory,
    signals: &DeviceSignals,
    max_attempts: u32,
    params: &RiskParams,
    now: Timestamp,
) -> RiskAssessment {
    let attempt_frequency_score = frequency_score(history, max_attempts, params);
    let device_consistency_score = if history.fingerprint_mismatch(&signals.fingerprint) {
        params.fingerprint_mismatch_weight
    } else {
        0
    };
    let automation_score = automation_score(signals, params);
    let context_score = context_score(signals, params);

    let sum = attempt_frequency_score as u32
        + device_consistency_score as u32
        + automation_score as u32
        + context_score as u32;
    let aggregate_risk_score = sum.min(100) as u8;

    let decision = if aggregate_risk_score >= params.block_threshold {
        RiskDecision::Block
    } else {
        RiskDecision::Allow
    };
    let blocked_reason = match decision {
        RiskDecision::Allow => None,
        RiskDecision::Block => Some(reason_for(aggregate_risk_score, params)),
    };

    RiskAssessment {
        device_fingerprint: signals.fingerprint.clone(),
        attempt_frequency_score,
        device_consistency_score,
        automation_score,
        context_score,
        aggregate_risk_score,
        decision,
        blocked_reason,
        assessed_at: now,
    }
}

fn frequency_score(history: &AttemptHistory, max_attempts: u32, params: &RiskParams) -> u8 {
    let over = if history.attempt_count > max_attempts {
        params.over_attempts_weight as u32
    } else {
        0
    };
    let burst = params.burst_weight as u32 * history.rapid_streak;
    (over + burst).min(u8::MAX as u32) as u8
}

fn automation_score(signals: &DeviceSignals, params: &RiskParams) -> u8 {
    let mut score = 0u32;
    if signals.headless_markers {
        score += params.headless_weight as u32;
    }
    if signals.tooling_signature() {
        score += params.tooling_weight as u32;
    }
    score.min(params.automation_cap as u32) as u8
}

fn context_score(signals: &DeviceSignals, params: &RiskParams) -> u8 {
    let mut score = 0u32;
    if signals.geo_mismatch {
        score += params.geo_mismatch_weight as u32;
    }
    if signals.vpn_detected {
        score += params.vpn_weight as u32;
    }
    score.min(u8::MAX as u32) as u8
}

/// Highest severity band the aggregate falls into.
fn reason_for(aggregate: u8, params: &RiskParams) -> BlockedReason {
    if aggregate >= params.high_risk_threshold {
        BlockedReason::HighFraudRisk
    } else if aggregate >= params.block_threshold {
        BlockedReason::SuspiciousActivity
    } else if aggregate >= params.elevated_risk_threshold {
        BlockedReason::MultipleFailedAttempts
    } else {
        BlockedReason::ThresholdExceeded
    }
}
