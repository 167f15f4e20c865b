//! Per-session-key attempt history.
//!
//! The history is owned by the store and mutated only through the
//! session-creation path — status polls never touch it.

use serde::{Deserialize, Serialize};
use tahaqq_types::{DeviceFingerprint, Timestamp};

/// Rolling attempt record for one session key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptHistory {
    /// Distinct session-creation calls seen for this key.
    pub attempt_count: u32,
    pub last_attempt_at: Option<Timestamp>,
    /// Consecutive attempts (including the latest) that each followed the
    /// previous one within the burst window. Resets to zero on any gap.
    pub rapid_streak: u32,
    /// Fingerprint recorded at the first attempt; later attempts are
    /// compared against it.
    pub initial_fingerprint: Option<DeviceFingerprint>,
}

impl AttemptHistory {
    pub fn empty() -> Self {
        Self {
            attempt_count: 0,
            last_attempt_at: None,
            rapid_streak: 0,
            initial_fingerprint: None,
        }
    }

    /// Record one session-creation attempt.
    ///
    /// Must be called exactly once per creation call, before scoring, so
    /// the scorer sees the attempt it is assessing.
    pub fn record_attempt(
        &mut self,
        fingerprint: &DeviceFingerprint,
        now: Timestamp,
        burst_window_secs: u64,
    ) {
        self.attempt_count += 1;
        self.rapid_streak = match self.last_attempt_at {
            Some(last) if last.elapsed_since(now) < burst_window_secs => self.rapid_streak + 1,
            _ => 0,
        };
        self.last_attempt_at = Some(now);
        if self.initial_fingerprint.is_none() {
            self.initial_fingerprint = Some(fingerprint.clone());
        }
    }

    /// Whether `fingerprint` differs from the one recorded at the first
    /// attempt. A missing baseline never counts as a mismatch.
    pub fn fingerprint_mismatch(&self, fingerprint: &DeviceFingerprint) -> bool {
        self.initial_fingerprint
            .as_ref()
            .is_some_and(|initial| initial != fingerprint)
    }
}

impl Default for AttemptHistory {
    fn default() -> Self {
        Self::empty()
    }
}
