//! Per-OID launch serialization.
//!
//! At most one launch may be in flight per session OID. A second
//! concurrent attempt is rejected with a conflict, never silently merged.

use crate::error::TransitionError;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tahaqq_types::SessionOid;

/// Tracks OIDs with an in-flight launch.
#[derive(Debug, Default)]
pub struct LaunchGuard {
    in_flight: Mutex<HashSet<String>>,
}

impl LaunchGuard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim the launch slot for `oid`. The permit releases it on drop,
    /// success or failure.
    pub fn acquire(self: &Arc<Self>, oid: &SessionOid) -> Result<LaunchPermit, TransitionError> {
        let mut in_flight = self.in_flight.lock().unwrap();
        if !in_flight.insert(oid.as_str().to_string()) {
            return Err(TransitionError::LaunchConflict(oid.to_string()));
        }
        Ok(LaunchPermit {
            guard: Arc::clone(self),
            oid: oid.as_str().to_string(),
        })
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }
}

/// RAII claim on a session's launch slot.
#[derive(Debug)]
pub struct LaunchPermit {
    guard: Arc<LaunchGuard>,
    oid: String,
}

impl Drop for LaunchPermit {
    fn drop(&mut self) {
        self.guard.in_flight.lock().unwrap().remove(&self.oid);
    }
}
