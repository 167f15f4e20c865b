//! Provider-facing request/response model and the trait the state machine
//! calls through.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tahaqq_types::{ProviderSessionId, VerificationType};

/// Status reported by the provider for a hosted session.
///
/// Anything other than `Processing` is terminal for the platform session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Processing,
    Verified,
    RequiresInput,
    Canceled,
}

impl ProviderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }

    pub fn parse(raw: &str) -> Result<Self, ProviderError> {
        match raw {
            "processing" => Ok(Self::Processing),
            "verified" => Ok(Self::Verified),
            "requires_input" => Ok(Self::RequiresInput),
            "canceled" => Ok(Self::Canceled),
            other => Err(ProviderError::Malformed(format!(
                "unrecognized provider status {other:?}"
            ))),
        }
    }
}

/// What the platform sends when opening a hosted verification session.
#[derive(Clone, Debug, Serialize)]
pub struct ProviderCreateRequest {
    #[serde(rename = "type")]
    pub verification_type: VerificationType,
    pub return_url: String,
    pub metadata: BTreeMap<String, String>,
}

/// What the provider hands back: the opaque id, the hosted flow handle,
/// and the initial status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderSession {
    pub id: ProviderSessionId,
    pub hosted_url: String,
    pub status: ProviderStatus,
}

/// The identity provider behind a narrow interface.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Open a hosted verification session.
    async fn create_session(
        &self,
        request: &ProviderCreateRequest,
    ) -> Result<ProviderSession, ProviderError>;

    /// Fetch the provider's current status for a session.
    async fn fetch_status(&self, id: &ProviderSessionId) -> Result<ProviderStatus, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing() {
        assert_eq!(
            ProviderStatus::parse("processing").unwrap(),
            ProviderStatus::Processing
        );
        assert_eq!(
            ProviderStatus::parse("verified").unwrap(),
            ProviderStatus::Verified
        );
        assert_eq!(
            ProviderStatus::parse("requires_input").unwrap(),
            ProviderStatus::RequiresInput
        );
        assert_eq!(
            ProviderStatus::parse("canceled").unwrap(),
            ProviderStatus::Canceled
        );
        assert!(ProviderStatus::parse("exploded").is_err());
    }

    #[test]
    fn only_processing_is_non_terminal() {
        assert!(!ProviderStatus::Processing.is_terminal());
        assert!(ProviderStatus::Verified.is_terminal());
        assert!(ProviderStatus::RequiresInput.is_terminal());
        assert!(ProviderStatus::Canceled.is_terminal());
    }

    #[test]
    fn create_request_serializes_type_field() {
        let req = ProviderCreateRequest {
            verification_type: VerificationType::Document,
            return_url: "https://operator.example/done".into(),
            metadata: BTreeMap::from([("operator".to_string(), "clinic-7".to_string())]),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"type\":\"document\""));
        assert!(json.contains("\"operator\":\"clinic-7\""));
    }
}
