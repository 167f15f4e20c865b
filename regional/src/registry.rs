//! Registry lookups: the trait the gateway consumes and the HTTP client
//! used in production.

use crate::error::RegistryError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A Saudi healthcare facility as reported by the NPHIES registry.
#[derive(Debug, Clone, Deserialize)]
pub struct FacilityRecord {
    pub code: String,
    pub active: bool,
    pub certified: bool,
}

/// A Sudanese wilaya (state) as reported by the national-id registry.
#[derive(Debug, Clone, Deserialize)]
pub struct WilayaRecord {
    pub code: String,
    pub active: bool,
}

/// A Sudanese ministry as reported by the national-id registry.
#[derive(Debug, Clone, Deserialize)]
pub struct MinistryRecord {
    pub code: String,
    pub active: bool,
}

/// External regional registries, one lookup per code class.
///
/// Implementations must map transport failures to
/// [`RegistryError::Unavailable`] so the gateway can degrade instead of
/// treating them as rejections.
#[async_trait]
pub trait RegionalRegistry: Send + Sync {
    async fn facility(&self, code: &str) -> Result<FacilityRecord, RegistryError>;
    async fn wilaya(&self, code: &str) -> Result<WilayaRecord, RegistryError>;
    async fn ministry(&self, code: &str) -> Result<MinistryRecord, RegistryError>;
}

#[derive(Clone)]
enum CachedRecord {
    Facility(FacilityRecord),
    Wilaya(WilayaRecord),
    Ministry(MinistryRecord),
}

/// HTTP client for the two production registries.
///
/// Registry rows are reference data and change rarely, so successful
/// lookups are memoized for `reference_ttl` to avoid hammering the
/// registries on every session. Failures are never cached.
pub struct HttpRegistry {
    client: reqwest::Client,
    /// Base URL of the Saudi healthcare (NPHIES) registry.
    healthcare_url: String,
    /// Base URL of the Sudan national-id registry.
    national_url: String,
    request_timeout: Duration,
    reference_ttl: Duration,
    /// Memoized lookups: prefixed code -> (expiry epoch secs, record).
    cache: Mutex<HashMap<String, (u64, CachedRecord)>>,
}

impl HttpRegistry {
    pub fn new(healthcare_url: &str, national_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            healthcare_url: healthcare_url.trim_end_matches('/').to_string(),
            national_url: national_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(5),
            reference_ttl: Duration::from_secs(3600),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_reference_ttl(mut self, ttl: Duration) -> Self {
        self.reference_ttl = ttl;
        self
    }

    fn epoch_now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    fn cache_get(&self, key: &str) -> Option<CachedRecord> {
        let cache = self.cache.lock().unwrap();
        cache
            .get(key)
            .filter(|(expires, _)| Self::epoch_now() < *expires)
            .map(|(_, record)| record.clone())
    }

    fn cache_put(&self, key: String, record: CachedRecord) {
        let expires = Self::epoch_now() + self.reference_ttl.as_secs();
        self.cache.lock().unwrap().insert(key, (expires, record));
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        code: &str,
    ) -> Result<T, RegistryError> {
        let resp = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(code.to_string()));
        }
        if !resp.status().is_success() {
            return Err(RegistryError::Unavailable(format!(
                "HTTP {} from {}",
                resp.status(),
                url
            )));
        }

        resp.json()
            .await
            .map_err(|e| RegistryError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl RegionalRegistry for HttpRegistry {
    async fn facility(&self, code: &str) -> Result<FacilityRecord, RegistryError> {
        let key = format!("facility:{code}");
        if let Some(CachedRecord::Facility(record)) = self.cache_get(&key) {
            return Ok(record);
        }
        let url = format!("{}/facilities/{}", self.healthcare_url, code);
        let record: FacilityRecord = self.fetch(&url, code).await?;
        self.cache_put(key, CachedRecord::Facility(record.clone()));
        Ok(record)
    }

    async fn wilaya(&self, code: &str) -> Result<WilayaRecord, RegistryError> {
        let key = format!("wilaya:{code}");
        if let Some(CachedRecord::Wilaya(record)) = self.cache_get(&key) {
            return Ok(record);
        }
        let url = format!("{}/wilayas/{}", self.national_url, code);
        let record: WilayaRecord = self.fetch(&url, code).await?;
        self.cache_put(key, CachedRecord::Wilaya(record.clone()));
        Ok(record)
    }

    async fn ministry(&self, code: &str) -> Result<MinistryRecord, RegistryError> {
        let key = format!("ministry:{code}");
        if let Some(CachedRecord::Ministry(record)) = self.cache_get(&key) {
            return Ok(record);
        }
        let url = format!("{}/ministries/{}", self.national_url, code);
        let record: MinistryRecord = self.fetch(&url, code).await?;
        self.cache_put(key, CachedRecord::Ministry(record.clone()));
        Ok(record)
    }
}
