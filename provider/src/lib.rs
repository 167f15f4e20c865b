//! Identity provider integration.
//!
//! The provider accepts a session-creation request, returns an opaque
//! session id plus a hosted verification handle, and later reports one of
//! four statuses. Everything else about the provider is its business; the
//! platform only consumes this narrow surface.

pub mod client;
pub mod error;
pub mod model;

pub use client::HttpIdentityProvider;
pub use error::ProviderError;
pub use model::{IdentityProvider, ProviderCreateRequest, ProviderSession, ProviderStatus};
