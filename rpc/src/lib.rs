//! HTTP surface for the verification service.
//!
//! Route map:
//! - `POST /v1/sessions` — create a verification session
//! - `GET  /v1/sessions` — reporting list (country + date range)
//! - `GET  /v1/sessions/:id` — merged status view by provider session id
//! - `POST /v1/sessions/:id/context` — attach regional context (`:id` is the OID)
//! - `POST /v1/sessions/:id/cancel` — operator cancel (`:id` is the OID)
//! - `GET  /health`, `GET /metrics`
//!
//! A risk block is a 200 response carrying `decision: "block"` — a
//! business decision, not an HTTP error.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use server::{router, serve};
