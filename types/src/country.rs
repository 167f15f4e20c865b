//! Country codes and their jurisdiction-specific validation requirements.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO 3166-1 alpha-2 country code for a verification session.
///
/// Saudi Arabia and Sudan carry jurisdiction-specific regional context
/// (healthcare and national-id respectively); every other country is
/// handled without regional validation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CountryCode {
    /// Saudi Arabia — healthcare facility/practitioner context.
    Sa,
    /// Sudan — national-id/wilaya/ministry context.
    Sd,
    /// United States.
    Us,
    /// Any other alpha-2 code, kept verbatim (uppercased).
    Other(String),
}

impl CountryCode {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "SA" => Self::Sa,
            "SD" => Self::Sd,
            "US" => Self::Us,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Sa => "SA",
            Self::Sd => "SD",
            Self::Us => "US",
            Self::Other(code) => code.as_str(),
        }
    }

    /// Whether sessions for this country must pass regional validation
    /// when regional context is supplied.
    pub fn requires_regional_validation(&self) -> bool {
        matches!(self, Self::Sa | Self::Sd)
    }

    /// ISO 3166-1 numeric code, used as the country arc of a session OID.
    /// Unknown countries map to 999 (reserved, unassigned by ISO).
    pub fn numeric_arc(&self) -> u32 {
        match self {
            Self::Sa => 682,
            Self::Sd => 729,
            Self::Us => 840,
            Self::Other(_) => 999,
        }
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for CountryCode {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<CountryCode> for String {
    fn from(c: CountryCode) -> Self {
        c.as_str().to_string()
    }
}
