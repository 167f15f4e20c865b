//! Read-through, write-through session cache.
//!
//! Reads check the cache first and fall back to the backing store,
//! repopulating with a short TTL. Writes always hit the backing store
//! first; the cache is only updated after the durable write is accepted.
//! Expiry is driven by the `now` argument, never by a wall clock, so
//! cache behavior is deterministic under test.

use crate::error::StoreError;
use crate::session::SessionStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tahaqq_types::{ProviderSessionId, SessionOid, Timestamp, VerificationSession};

struct Entry {
    expires_at: Timestamp,
    session: VerificationSession,
}

/// TTL'd session cache in front of a [`SessionStore`].
pub struct CachedSessionStore<S: SessionStore + ?Sized> {
    inner: Arc<S>,
    entries: Mutex<HashMap<String, Entry>>,
    ttl_secs: u64,
}

impl<S: SessionStore + ?Sized> CachedSessionStore<S> {
    pub fn new(inner: Arc<S>, ttl_secs: u64) -> Self {
        Self {
            inner,
            entries: Mutex::new(HashMap::new()),
            ttl_secs,
        }
    }

    /// The backing store, for operations the cache does not mediate.
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    /// Durable write first, then cache update.
    pub fn put_session(
        &self,
        session: &VerificationSession,
        now: Timestamp,
    ) -> Result<VerificationSession, StoreError> {
        let version = self.inner.put_session(session)?;
        let mut accepted = session.clone();
        accepted.version = version;
        self.cache_insert(&accepted, now);
        Ok(accepted)
    }

    pub fn get_by_oid(
        &self,
        oid: &SessionOid,
        now: Timestamp,
    ) -> Result<VerificationSession, StoreError> {
        let key = Self::oid_key(oid);
        if let Some(session) = self.cache_get(&key, now) {
            return Ok(session);
        }
        let session = self.inner.get_by_oid(oid)?;
        self.cache_insert(&session, now);
        Ok(session)
    }

    pub fn get_by_provider_id(
        &self,
        id: &ProviderSessionId,
        now: Timestamp,
    ) -> Result<VerificationSession, StoreError> {
        let key = Self::provider_key(id);
        if let Some(session) = self.cache_get(&key, now) {
            return Ok(session);
        }
        let session = self.inner.get_by_provider_id(id)?;
        self.cache_insert(&session, now);
        Ok(session)
    }

    /// Drop expired entries. Safe to call from a periodic task.
    pub fn evict_expired(&self, now: Timestamp) {
        self.entries
            .lock()
            .unwrap()
            .retain(|_, entry| now < entry.expires_at);
    }

    pub fn cached_len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    fn cache_get(&self, key: &str, now: Timestamp) -> Option<VerificationSession> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.session.clone())
    }

    fn cache_insert(&self, session: &VerificationSession, now: Timestamp) {
        let expires_at = now.plus_secs(self.ttl_secs);
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            Self::oid_key(&session.oid),
            Entry {
                expires_at,
                session: session.clone(),
            },
        );
        if let Some(id) = &session.provider_session_id {
            entries.insert(
                Self::provider_key(id),
                Entry {
                    expires_at,
                    session: session.clone(),
                },
            );
        }
    }

    fn oid_key(oid: &SessionOid) -> String {
        format!("oid:{oid}")
    }

    fn provider_key(id: &ProviderSessionId) -> String {
        format!("pid:{id}")
    }
}
