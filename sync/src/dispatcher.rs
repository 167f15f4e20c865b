//! The dispatch queue and its background worker.

use crate::snapshot::ContextSnapshot;
use crate::transport::SyncTransport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default bound for the dispatch queue.
const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Cloneable submission side of the dispatcher.
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<ContextSnapshot>,
}

impl SyncHandle {
    /// Submit a snapshot. Never blocks: a full queue drops the snapshot
    /// (and reports it) rather than stalling the caller.
    pub fn dispatch(&self, snapshot: ContextSnapshot) -> bool {
        match self.tx.try_send(snapshot) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(snapshot)) => {
                warn!(oid = %snapshot.oid, "sync queue full, dropping snapshot");
                false
            }
            Err(mpsc::error::TrySendError::Closed(snapshot)) => {
                warn!(oid = %snapshot.oid, "sync dispatcher stopped, dropping snapshot");
                false
            }
        }
    }
}

/// Owns the background delivery worker.
pub struct NeuralDispatcher {
    handle: SyncHandle,
    worker: JoinHandle<()>,
}

impl NeuralDispatcher {
    /// Spawn the worker with the standard queue bound.
    pub fn spawn(
        transport: Arc<dyn SyncTransport>,
        max_attempts: u32,
        backoff_ms: u64,
    ) -> Self {
        Self::spawn_with_capacity(transport, max_attempts, backoff_ms, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn spawn_with_capacity(
        transport: Arc<dyn SyncTransport>,
        max_attempts: u32,
        backoff_ms: u64,
        capacity: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let worker = tokio::spawn(run_worker(rx, transport, max_attempts, backoff_ms));
        Self {
            handle: SyncHandle { tx },
            worker,
        }
    }

    pub fn handle(&self) -> SyncHandle {
        self.handle.clone()
    }

    /// Drain the queue and stop. Every [`SyncHandle`] clone must be
    /// dropped first or the worker keeps waiting for more snapshots.
    pub async fn shutdown(self) {
        drop(self.handle);
        let _ = self.worker.await;
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<ContextSnapshot>,
    transport: Arc<dyn SyncTransport>,
    max_attempts: u32,
    backoff_ms: u64,
) {
    while let Some(snapshot) = rx.recv().await {
        deliver_with_retry(&*transport, &snapshot, max_attempts, backoff_ms).await;
    }
    debug!("sync dispatcher drained and stopped");
}

/// At-least-once delivery attempt loop: capped retries, doubling backoff,
/// then drop with a warning. Failures never propagate to the caller.
async fn deliver_with_retry(
    transport: &dyn SyncTransport,
    snapshot: &ContextSnapshot,
    max_attempts: u32,
    backoff_ms: u64,
) {
    let mut backoff = Duration::from_millis(backoff_ms);
    for attempt in 1..=max_attempts.max(1) {
        match transport.deliver(snapshot).await {
            Ok(()) => {
                debug!(oid = %snapshot.oid, attempt, "sync snapshot delivered");
                return;
            }
            Err(e) if attempt < max_attempts.max(1) => {
                debug!(oid = %snapshot.oid, attempt, error = %e, "sync delivery failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(e) => {
                warn!(
                    oid = %snapshot.oid,
                    attempts = max_attempts,
                    error = %e,
                    "sync delivery exhausted retries, dropping snapshot"
                );
            }
        }
    }
}
