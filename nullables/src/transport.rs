//! Nullable sync transport — records delivered snapshots.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tahaqq_sync::{ContextSnapshot, SyncError, SyncTransport};

/// Records every delivered snapshot; can fail the next N deliveries.
pub struct NullTransport {
    delivered: Mutex<Vec<ContextSnapshot>>,
    failures: AtomicU32,
}

impl NullTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            delivered: Mutex::new(Vec::new()),
            failures: AtomicU32::new(0),
        })
    }

    /// Fail this many upcoming deliveries with `Unreachable`.
    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<ContextSnapshot> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl SyncTransport for NullTransport {
    async fn deliver(&self, snapshot: &ContextSnapshot) -> Result<(), SyncError> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SyncError::Unreachable("null transport offline".into()));
        }
        self.delivered.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}
