use tahaqq_types::SessionStatus;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("session {oid} is terminal ({status}) and cannot transition")]
    TerminalState { oid: String, status: SessionStatus },

    #[error("invalid transition from {from} for {operation}")]
    InvalidTransition {
        from: SessionStatus,
        operation: &'static str,
    },

    #[error("regional context is locked once the session reaches launch")]
    ContextLocked,

    #[error("regional attachment does not match session country {0}")]
    AttachmentCountryMismatch(String),

    #[error("a launch is already in flight for session {0}")]
    LaunchConflict(String),
}
