use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unreachable: {0}")]
    Unreachable(String),

    #[error("provider rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("provider session not found: {0}")]
    UnknownSession(String),

    #[error("provider returned a malformed response: {0}")]
    Malformed(String),
}
