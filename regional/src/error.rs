use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("code not found in registry: {0}")]
    NotFound(String),

    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("registry returned a malformed response: {0}")]
    Malformed(String),
}
