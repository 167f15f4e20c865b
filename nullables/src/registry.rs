//! Nullable regional registry — scriptable code tables with failure
//! injection.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tahaqq_regional::{
    FacilityRecord, MinistryRecord, RegionalRegistry, RegistryError, WilayaRecord,
};

/// In-memory registry tables for both jurisdictions.
///
/// Scriptable knobs: mark the registry unavailable, or add artificial
/// latency to exercise the gateway's timeout budget.
pub struct NullRegistry {
    facilities: Mutex<HashMap<String, (bool, bool)>>,
    wilayas: Mutex<HashMap<String, bool>>,
    ministries: Mutex<HashMap<String, bool>>,
    unavailable: AtomicBool,
    latency_ms: AtomicU32,
    lookups: AtomicU32,
}

impl NullRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            facilities: Mutex::new(HashMap::new()),
            wilayas: Mutex::new(HashMap::new()),
            ministries: Mutex::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            latency_ms: AtomicU32::new(0),
            lookups: AtomicU32::new(0),
        })
    }

    /// A registry pre-seeded with the standard test rows: facility
    /// `KSA001` (active, certified) and wilaya `SD01` (active).
    pub fn seeded() -> Arc<Self> {
        let registry = Self::new();
        registry.add_facility("KSA001", true, true);
        registry.add_wilaya("SD01", true);
        registry.add_ministry("MOH", true);
        registry
    }

    pub fn add_facility(&self, code: &str, active: bool, certified: bool) {
        self.facilities
            .lock()
            .unwrap()
            .insert(code.to_string(), (active, certified));
    }

    pub fn add_wilaya(&self, code: &str, active: bool) {
        self.wilayas.lock().unwrap().insert(code.to_string(), active);
    }

    pub fn add_ministry(&self, code: &str, active: bool) {
        self.ministries
            .lock()
            .unwrap()
            .insert(code.to_string(), active);
    }

    /// All further lookups fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// All further lookups sleep this long before answering.
    pub fn set_latency_ms(&self, ms: u32) {
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    pub fn lookup_count(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }

    async fn gate(&self) -> Result<(), RegistryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency as u64)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("null registry offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RegionalRegistry for NullRegistry {
    async fn facility(&self, code: &str) -> Result<FacilityRecord, RegistryError> {
        self.gate().await?;
        let (active, certified) = self
            .facilities
            .lock()
            .unwrap()
            .get(code)
            .copied()
            .ok_or_else(|| RegistryError::NotFound(code.to_string()))?;
        Ok(FacilityRecord {
            code: code.to_string(),
            active,
            certified,
        })
    }

    async fn wilaya(&self, code: &str) -> Result<WilayaRecord, RegistryError> {
        self.gate().await?;
        let active = self
            .wilayas
            .lock()
            .unwrap()
            .get(code)
            .copied()
            .ok_or_else(|| RegistryError::NotFound(code.to_string()))?;
        Ok(WilayaRecord {
            code: code.to_string(),
            active,
        })
    }

    async fn ministry(&self, code: &str) -> Result<MinistryRecord, RegistryError> {
        self.gate().await?;
        let active = self
            .ministries
            .lock()
            .unwrap()
            .get(code)
            .copied()
            .ok_or_else(|| RegistryError::NotFound(code.to_string()))?;
        Ok(MinistryRecord {
            code: code.to_string(),
            active,
        })
    }
}
