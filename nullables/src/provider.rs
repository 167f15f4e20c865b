//! Nullable identity provider — scripted session creation and status
//! sequences.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tahaqq_provider::{
    IdentityProvider, ProviderCreateRequest, ProviderError, ProviderSession, ProviderStatus,
};
use tahaqq_types::ProviderSessionId;

/// In-memory provider double.
///
/// Created sessions get sequential `vs_null_N` ids and start
/// `Processing`. Status polls replay a scripted sequence per session,
/// holding the final entry once the script runs out.
pub struct NullProvider {
    next_id: AtomicU64,
    /// Fail this many upcoming create calls with `Unreachable`.
    create_failures: AtomicU32,
    scripts: Mutex<HashMap<String, VecDeque<ProviderStatus>>>,
    create_calls: AtomicU32,
    status_calls: AtomicU32,
}

impl NullProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            create_failures: AtomicU32::new(0),
            scripts: Mutex::new(HashMap::new()),
            create_calls: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
        })
    }

    /// Make the next `n` create calls fail as unreachable.
    pub fn fail_next_creates(&self, n: u32) {
        self.create_failures.store(n, Ordering::SeqCst);
    }

    /// Script the statuses a session reports, in poll order. The last
    /// entry is sticky.
    pub fn script_statuses(&self, id: &ProviderSessionId, statuses: Vec<ProviderStatus>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(id.as_str().to_string(), statuses.into());
    }

    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for NullProvider {
    async fn create_session(
        &self,
        _request: &ProviderCreateRequest,
    ) -> Result<ProviderSession, ProviderError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .create_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ProviderError::Unreachable("null provider offline".into()));
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = format!("vs_null_{n}");
        self.scripts
            .lock()
            .unwrap()
            .entry(id.clone())
            .or_insert_with(|| VecDeque::from([ProviderStatus::Processing]));

        Ok(ProviderSession {
            id: ProviderSessionId::new(id.as_str()),
            hosted_url: format!("https://verify.null/start/{id}"),
            status: ProviderStatus::Processing,
        })
    }

    async fn fetch_status(&self, id: &ProviderSessionId) -> Result<ProviderStatus, ProviderError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts
            .get_mut(id.as_str())
            .ok_or_else(|| ProviderError::UnknownSession(id.to_string()))?;

        if queue.len() > 1 {
            Ok(queue.pop_front().expect("non-empty queue"))
        } else {
            queue
                .front()
                .copied()
                .ok_or_else(|| ProviderError::UnknownSession(id.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tahaqq_types::VerificationType;

    fn request() -> ProviderCreateRequest {
        ProviderCreateRequest {
            verification_type: VerificationType::Document,
            return_url: "https://operator.example/return".into(),
            metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn creates_sequential_processing_sessions() {
        let provider = NullProvider::new();
        let a = provider.create_session(&request()).await.unwrap();
        let b = provider.create_session(&request()).await.unwrap();

        assert_eq!(a.id.as_str(), "vs_null_1");
        assert_eq!(b.id.as_str(), "vs_null_2");
        assert_eq!(a.status, ProviderStatus::Processing);
        assert_eq!(provider.create_calls(), 2);
    }

    #[tokio::test]
    async fn scripted_statuses_replay_then_stick() {
        let provider = NullProvider::new();
        let session = provider.create_session(&request()).await.unwrap();
        provider.script_statuses(
            &session.id,
            vec![
                ProviderStatus::Processing,
                ProviderStatus::Processing,
                ProviderStatus::Verified,
            ],
        );

        assert_eq!(
            provider.fetch_status(&session.id).await.unwrap(),
            ProviderStatus::Processing
        );
        assert_eq!(
            provider.fetch_status(&session.id).await.unwrap(),
            ProviderStatus::Processing
        );
        assert_eq!(
            provider.fetch_status(&session.id).await.unwrap(),
            ProviderStatus::Verified
        );
        // Sticky.
        assert_eq!(
            provider.fetch_status(&session.id).await.unwrap(),
            ProviderStatus::Verified
        );
    }

    #[tokio::test]
    async fn injected_failures_then_recovery() {
        let provider = NullProvider::new();
        provider.fail_next_creates(1);

        assert!(matches!(
            provider.create_session(&request()).await,
            Err(ProviderError::Unreachable(_))
        ));
        assert!(provider.create_session(&request()).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_session_errors() {
        let provider = NullProvider::new();
        assert!(matches!(
            provider
                .fetch_status(&ProviderSessionId::new("vs_ghost"))
                .await,
            Err(ProviderError::UnknownSession(_))
        ));
    }
}
