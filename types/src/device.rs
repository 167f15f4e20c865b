//! Device fingerprints and edge-supplied automation signals.
//!
//! The platform never derives these signals itself — whatever edge or
//! client layer exists computes them and submits the resulting booleans.
//! The risk scorer depends only on the values here, not on how they were
//! produced.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque device fingerprint hash.
///
/// Stored lowercase-hex. Raw client material is normalized through
/// SHA-256 so equal inputs always compare equal and nothing
/// identifiable is retained.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceFingerprint(String);

impl DeviceFingerprint {
    /// Wrap an already-hashed fingerprint (as delivered by the edge).
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self(hash.into().to_ascii_lowercase())
    }

    /// Hash raw client material into a fingerprint.
    pub fn from_raw(raw: &[u8]) -> Self {
        let digest = Sha256::digest(raw);
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Boolean automation indicators plus the device fingerprint for one
/// session-creation attempt.
///
/// Missing telemetry must be submitted as `false` — absent signals
/// contribute nothing to the risk score.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSignals {
    pub fingerprint: DeviceFingerprint,

    /// Headless-browser markers (webdriver flags, missing chrome surface).
    #[serde(default)]
    pub headless_markers: bool,

    /// Known automation-tooling signature in the user agent or runtime.
    #[serde(default)]
    pub automation_tooling: bool,

    /// Browser reports an empty plugin list.
    #[serde(default)]
    pub zero_plugins: bool,

    /// Browser reports an empty accept-language list.
    #[serde(default)]
    pub empty_language_list: bool,

    /// Request geolocation disagrees with the declared country.
    /// Stubbed off until wired to an IP-intelligence source.
    #[serde(default)]
    pub geo_mismatch: bool,

    /// VPN or proxy exit detected. Stubbed off like `geo_mismatch`.
    #[serde(default)]
    pub vpn_detected: bool,
}

impl DeviceSignals {
    /// Signals with no indicators set, for the common clean-device case.
    pub fn clean(fingerprint: DeviceFingerprint) -> Self {
        Self {
            fingerprint,
            headless_markers: false,
            automation_tooling: false,
            zero_plugins: false,
            empty_language_list: false,
            geo_mismatch: false,
            vpn_detected: false,
        }
    }

    /// Whether any tooling-signature evidence is present (distinct from
    /// headless markers, which score separately).
    pub fn tooling_signature(&self) -> bool {
        self.automation_tooling || self.zero_plugins || self.empty_language_list
    }
}
