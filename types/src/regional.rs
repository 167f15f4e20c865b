//! Country-specific identity context attached to a session.

use crate::country::CountryCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Insurance standing of a Saudi healthcare practitioner or facility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceStatus {
    Active,
    Suspended,
    Expired,
    Pending,
}

/// Citizenship standing recorded against a Sudanese national id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitizenshipStatus {
    Citizen,
    Resident,
    Visitor,
}

/// Regional identity context, one variant per jurisdiction.
///
/// A session holds at most one attachment and the variant must match the
/// session's country. `is_valid` is set by the regional validator gateway;
/// the attachment is immutable once the session reaches launch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionalAttachment {
    /// Saudi healthcare context (NPHIES).
    Healthcare {
        nphies_id: String,
        facility_code: Option<String>,
        practitioner_id: Option<String>,
        insurance_status: InsuranceStatus,
        is_valid: bool,
    },
    /// Sudan national-id context.
    NationalId {
        national_id: String,
        wilaya_code: String,
        ministry_code: Option<String>,
        ministry_access: BTreeSet<String>,
        citizenship_status: CitizenshipStatus,
        is_valid: bool,
    },
}

impl RegionalAttachment {
    /// Whether this variant belongs to the given country.
    pub fn matches_country(&self, country: &CountryCode) -> bool {
        match self {
            Self::Healthcare { .. } => *country == CountryCode::Sa,
            Self::NationalId { .. } => *country == CountryCode::Sd,
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Self::Healthcare { is_valid, .. } | Self::NationalId { is_valid, .. } => *is_valid,
        }
    }

    pub fn set_valid(&mut self, valid: bool) {
        match self {
            Self::Healthcare { is_valid, .. } | Self::NationalId { is_valid, .. } => {
                *is_valid = valid;
            }
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Healthcare { .. } => "healthcare",
            Self::NationalId { .. } => "national_id",
        }
    }
}
