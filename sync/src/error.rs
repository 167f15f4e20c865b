use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("sync channel closed mid-delivery")]
    Closed,

    #[error("snapshot serialization failed: {0}")]
    Serialization(String),
}
