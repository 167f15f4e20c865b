//! Service-level error taxonomy.
//!
//! A risk block is deliberately absent here — it is a business decision
//! returned in the create-session payload, not a fault.

use tahaqq_session::TransitionError;
use tahaqq_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Bad input shape or an invalid/inactive regional code. The caller
    /// must fix the request before retrying.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("session not found: {0}")]
    NotFound(String),

    /// The identity provider stayed unreachable through the retry budget.
    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The caller must back off, re-check status, then retry.
    #[error("concurrent launch conflict for session {0}")]
    LaunchConflict(String),

    #[error(transparent)]
    Transition(TransitionError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<TransitionError> for ServiceError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::LaunchConflict(oid) => Self::LaunchConflict(oid),
            TransitionError::AttachmentCountryMismatch(country) => {
                Self::Validation(format!("regional context does not match country {country}"))
            }
            other => Self::Transition(other),
        }
    }
}
