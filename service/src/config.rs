//! Service configuration with TOML file support.

use serde::{Deserialize, Serialize};
use tahaqq_types::OrchestrationParams;

use crate::ServiceError;

/// Configuration for the verification service.
///
/// Can be loaded from a TOML file via [`ServiceConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Port the HTTP API listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Base URL of the identity provider's REST API.
    #[serde(default = "default_provider_url")]
    pub provider_url: String,

    /// API key for the identity provider. Usually supplied via the
    /// environment rather than the file.
    #[serde(default)]
    pub provider_api_key: String,

    /// Base URL of the Saudi healthcare (NPHIES) registry.
    #[serde(default = "default_healthcare_registry_url")]
    pub healthcare_registry_url: String,

    /// Base URL of the Sudan national-id registry.
    #[serde(default = "default_national_registry_url")]
    pub national_registry_url: String,

    /// WebSocket endpoint for neural sync. Empty disables dispatch.
    #[serde(default)]
    pub sync_endpoint: String,

    /// Organizational base arc for generated session OIDs.
    #[serde(default = "default_base_arc")]
    pub oid_base_arc: String,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to expose the Prometheus metrics endpoint.
    #[serde(default)]
    pub enable_metrics: bool,

    /// Orchestration tunables (risk weights, timeouts, TTLs).
    #[serde(default)]
    pub params: OrchestrationParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_listen_port() -> u16 {
    8080
}

fn default_provider_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_healthcare_registry_url() -> String {
    "https://nphies.sa/registry".to_string()
}

fn default_national_registry_url() -> String {
    "https://nid.gov.sd/registry".to_string()
}

fn default_base_arc() -> String {
    tahaqq_types::oid::DEFAULT_BASE_ARC.to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ServiceConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, ServiceError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServiceError::Validation(format!("config file: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ServiceError> {
        toml::from_str(s).map_err(|e| ServiceError::Validation(format!("config parse: {e}")))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            provider_url: default_provider_url(),
            provider_api_key: String::new(),
            healthcare_registry_url: default_healthcare_registry_url(),
            national_registry_url: default_national_registry_url(),
            sync_endpoint: String::new(),
            oid_base_arc: default_base_arc(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
            params: OrchestrationParams::standard(),
        }
    }
}
