//! The verification service.
//!
//! Wires the risk scorer, regional validator gateway, identity provider,
//! session store, state machine, and neural sync dispatcher into the
//! request-handling path. Every component is constructed explicitly and
//! passed in by handle — there is no process-wide mutable state.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod service;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use logging::{init_logging, LogFormat};
pub use metrics::ServiceMetrics;
pub use service::{
    CreateSessionOutcome, CreateSessionRequest, SessionView, VerificationService,
};
