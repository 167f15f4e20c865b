//! Bundled in-memory backend.
//!
//! Records are held bincode-encoded, the same way a KV backend would hold
//! them, so the serialization path is exercised even without an external
//! database. Thread-safe behind per-table mutexes.

use crate::assessment::AssessmentStore;
use crate::attempt::AttemptStore;
use crate::error::StoreError;
use crate::session::SessionStore;
use std::collections::HashMap;
use std::sync::Mutex;
use tahaqq_risk::{AttemptHistory, RiskAssessment};
use tahaqq_types::{CountryCode, ProviderSessionId, SessionOid, Timestamp, VerificationSession};

pub struct MemoryStore {
    /// OID string -> bincode-encoded session.
    sessions: Mutex<HashMap<String, Vec<u8>>>,
    /// Provider session id -> OID string.
    provider_index: Mutex<HashMap<String, String>>,
    /// OID string -> bincode-encoded assessments, append order.
    assessments: Mutex<HashMap<String, Vec<Vec<u8>>>>,
    /// Session key -> attempt history.
    attempts: Mutex<HashMap<String, AttemptHistory>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            provider_index: Mutex::new(HashMap::new()),
            assessments: Mutex::new(HashMap::new()),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn decode_session(bytes: &[u8]) -> Result<VerificationSession, StoreError> {
        Self::decode(bytes)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemoryStore {
    fn put_session(&self, session: &VerificationSession) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        let key = session.oid.as_str().to_string();

        if let Some(existing) = sessions.get(&key) {
            let stored = Self::decode_session(existing)?;
            if stored.version != session.version {
                return Err(StoreError::VersionConflict {
                    key,
                    expected: session.version,
                    found: stored.version,
                });
            }
        } else if session.version != 0 {
            return Err(StoreError::NotFound(key));
        }

        let mut accepted = session.clone();
        accepted.version = session.version + 1;
        sessions.insert(key.clone(), Self::encode(&accepted)?);

        if let Some(provider_id) = &accepted.provider_session_id {
            self.provider_index
                .lock()
                .unwrap()
                .insert(provider_id.as_str().to_string(), key);
        }

        Ok(accepted.version)
    }

    fn get_by_oid(&self, oid: &SessionOid) -> Result<VerificationSession, StoreError> {
        let sessions = self.sessions.lock().unwrap();
        let bytes = sessions
            .get(oid.as_str())
            .ok_or_else(|| StoreError::NotFound(oid.to_string()))?;
        Self::decode_session(bytes)
    }

    fn get_by_provider_id(
        &self,
        id: &ProviderSessionId,
    ) -> Result<VerificationSession, StoreError> {
        let oid = {
            let index = self.provider_index.lock().unwrap();
            index
                .get(id.as_str())
                .cloned()
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?
        };
        let sessions = self.sessions.lock().unwrap();
        let bytes = sessions
            .get(&oid)
            .ok_or_else(|| StoreError::NotFound(oid.clone()))?;
        Self::decode_session(bytes)
    }

    fn list_by_country_and_range(
        &self,
        country: &CountryCode,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<VerificationSession>, StoreError> {
        let sessions = self.sessions.lock().unwrap();
        let mut result = Vec::new();
        for bytes in sessions.values() {
            let session = Self::decode_session(bytes)?;
            if session.country == *country && session.created_at >= from && session.created_at < to
            {
                result.push(session);
            }
        }
        result.sort_by_key(|s| s.created_at);
        Ok(result)
    }

    fn list_non_terminal(&self) -> Result<Vec<VerificationSession>, StoreError> {
        let sessions = self.sessions.lock().unwrap();
        let mut result = Vec::new();
        for bytes in sessions.values() {
            let session = Self::decode_session(bytes)?;
            if !session.is_terminal() {
                result.push(session);
            }
        }
        result.sort_by_key(|s| s.created_at);
        Ok(result)
    }
}

impl AssessmentStore for MemoryStore {
    fn append_assessment(
        &self,
        oid: &SessionOid,
        assessment: &RiskAssessment,
    ) -> Result<(), StoreError> {
        let encoded = Self::encode(assessment)?;
        self.assessments
            .lock()
            .unwrap()
            .entry(oid.as_str().to_string())
            .or_default()
            .push(encoded);
        Ok(())
    }

    fn get_assessments(&self, oid: &SessionOid) -> Result<Vec<RiskAssessment>, StoreError> {
        let assessments = self.assessments.lock().unwrap();
        assessments
            .get(oid.as_str())
            .map(|entries| entries.iter().map(|b| Self::decode(b)).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

impl AttemptStore for MemoryStore {
    fn get_history(&self, session_key: &str) -> Result<AttemptHistory, StoreError> {
        Ok(self
            .attempts
            .lock()
            .unwrap()
            .get(session_key)
            .cloned()
            .unwrap_or_default())
    }

    fn put_history(&self, session_key: &str, history: &AttemptHistory) -> Result<(), StoreError> {
        self.attempts
            .lock()
            .unwrap()
            .insert(session_key.to_string(), history.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tahaqq_types::oid::DEFAULT_BASE_ARC;
    use tahaqq_types::{DeviceFingerprint, VerificationType};

    fn oid(seq: u64) -> SessionOid {
        SessionOid::assemble(
            DEFAULT_BASE_ARC,
            &CountryCode::Sa,
            Timestamp::new(1_733_000_000),
            seq,
        )
    }

    fn session(seq: u64) -> VerificationSession {
        VerificationSession::new(
            oid(seq),
            VerificationType::Document,
            CountryCode::Sa,
            "https://operator.example/return".into(),
            BTreeMap::new(),
            3,
            Timestamp::new(1_733_000_000 + seq),
            86_400,
        )
    }

    #[test]
    fn put_and_get_round_trip() {
        let store = MemoryStore::new();
        let s = session(1);
        let version = store.put_session(&s).unwrap();
        assert_eq!(version, 1);

        let loaded = store.get_by_oid(&s.oid).unwrap();
        assert_eq!(loaded.oid, s.oid);
        assert_eq!(loaded.version, 1);
    }

    #[test]
    fn version_conflict_on_stale_write() {
        let store = MemoryStore::new();
        let s = session(1);
        store.put_session(&s).unwrap();

        // Writing again with the original version 0 must conflict.
        let result = store.put_session(&s);
        assert!(matches!(
            result,
            Err(StoreError::VersionConflict {
                expected: 0,
                found: 1,
                ..
            })
        ));

        // Re-read and write at the current version succeeds.
        let mut current = store.get_by_oid(&s.oid).unwrap();
        current.risk_score = 40;
        assert_eq!(store.put_session(&current).unwrap(), 2);
    }

    #[test]
    fn update_with_unknown_oid_and_nonzero_version_fails() {
        let store = MemoryStore::new();
        let mut s = session(1);
        s.version = 3;
        assert!(matches!(
            store.put_session(&s),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn provider_index_resolves_after_assignment() {
        let store = MemoryStore::new();
        let s = session(1);
        store.put_session(&s).unwrap();

        let mut current = store.get_by_oid(&s.oid).unwrap();
        current.provider_session_id = Some(ProviderSessionId::new("vs_42"));
        store.put_session(&current).unwrap();

        let loaded = store
            .get_by_provider_id(&ProviderSessionId::new("vs_42"))
            .unwrap();
        assert_eq!(loaded.oid, s.oid);

        assert!(matches!(
            store.get_by_provider_id(&ProviderSessionId::new("vs_missing")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn country_range_listing_filters_and_sorts() {
        let store = MemoryStore::new();
        for seq in 1..=3 {
            store.put_session(&session(seq)).unwrap();
        }
        let mut sd = session(9);
        sd.country = CountryCode::Sd;
        store.put_session(&sd).unwrap();

        let listed = store
            .list_by_country_and_range(
                &CountryCode::Sa,
                Timestamp::new(1_733_000_001),
                Timestamp::new(1_733_000_003),
            )
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        assert!(listed.iter().all(|s| s.country == CountryCode::Sa));
    }

    #[test]
    fn assessments_append_in_order() {
        let store = MemoryStore::new();
        let s = session(1);
        let mut history = AttemptHistory::empty();
        let fp = DeviceFingerprint::from_hash("aa");
        for i in 0..3u64 {
            history.record_attempt(&fp, Timestamp::new(100 + i * 60), 5);
            let a = tahaqq_risk::assess(
                &history,
                &tahaqq_types::DeviceSignals::clean(fp.clone()),
                3,
                &tahaqq_types::RiskParams::standard(),
                Timestamp::new(100 + i * 60),
            );
            store.append_assessment(&s.oid, &a).unwrap();
        }

        let loaded = store.get_assessments(&s.oid).unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(loaded
            .windows(2)
            .all(|w| w[0].assessed_at <= w[1].assessed_at));
    }

    #[test]
    fn unknown_session_key_yields_empty_history() {
        let store = MemoryStore::new();
        let history = store.get_history("fresh-key").unwrap();
        assert_eq!(history.attempt_count, 0);
    }
}
