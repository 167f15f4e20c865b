//! Session identifiers.
//!
//! Every session is named by a hierarchical OID — dot-separated numeric
//! segments encoding the organizational base arc, the country's ISO numeric
//! code, the creation epoch, and a per-process sequence number:
//!
//! ```text
//! 1.3.6.1.4.1.61026.10.682.1733000000.17
//! └────── base arc ─────┘ └SA┘ └epoch──┘ └seq┘
//! ```
//!
//! The provider-assigned session id is opaque and kept as-is.

use crate::country::CountryCode;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Default organizational base arc for generated OIDs.
pub const DEFAULT_BASE_ARC: &str = "1.3.6.1.4.1.61026.10";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OidParseError {
    #[error("OID must have at least 4 dot-separated segments, got {0}")]
    TooShort(usize),

    #[error("OID segment {0:?} is not numeric")]
    NonNumericSegment(String),

    #[error("OID is empty")]
    Empty,
}

/// Hierarchical identifier uniquely naming a verification session.
///
/// Immutable once assigned. The trailing three segments are always
/// `<country_arc>.<epoch_secs>.<sequence>`; everything before them is the
/// organizational base arc.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionOid(String);

impl SessionOid {
    /// Assemble an OID from its parts.
    pub fn assemble(base_arc: &str, country: &CountryCode, created_at: Timestamp, seq: u64) -> Self {
        Self(format!(
            "{}.{}.{}.{}",
            base_arc,
            country.numeric_arc(),
            created_at.as_secs(),
            seq
        ))
    }

    /// Parse and validate a dot-separated numeric OID.
    pub fn parse(raw: &str) -> Result<Self, OidParseError> {
        if raw.is_empty() {
            return Err(OidParseError::Empty);
        }
        let segments: Vec<&str> = raw.split('.').collect();
        if segments.len() < 4 {
            return Err(OidParseError::TooShort(segments.len()));
        }
        for seg in &segments {
            if seg.is_empty() || !seg.bytes().all(|b| b.is_ascii_digit()) {
                return Err(OidParseError::NonNumericSegment(seg.to_string()));
            }
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The country arc segment (third from the end).
    pub fn country_arc(&self) -> u32 {
        self.segment_from_end(2)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    /// The creation epoch encoded in the OID (second from the end).
    pub fn created_at(&self) -> Timestamp {
        Timestamp::new(
            self.segment_from_end(1)
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        )
    }

    fn segment_from_end(&self, n: usize) -> Option<&str> {
        let segments: Vec<&str> = self.0.split('.').collect();
        segments.len().checked_sub(n + 1).map(|i| segments[i])
    }
}

impl fmt::Display for SessionOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionOid {
    type Err = OidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Generates session OIDs with a process-local monotonic sequence.
///
/// The sequence only disambiguates OIDs minted within the same epoch
/// second; uniqueness across restarts comes from the epoch segment.
pub struct OidGenerator {
    base_arc: String,
    sequence: AtomicU64,
}

impl OidGenerator {
    pub fn new(base_arc: impl Into<String>) -> Self {
        Self {
            base_arc: base_arc.into(),
            sequence: AtomicU64::new(1),
        }
    }

    pub fn next(&self, country: &CountryCode, now: Timestamp) -> SessionOid {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        SessionOid::assemble(&self.base_arc, country, now, seq)
    }
}

impl Default for OidGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_ARC)
    }
}

/// Opaque session id assigned by the external identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderSessionId(String);

impl ProviderSessionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
