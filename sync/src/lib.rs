//! Neural sync — best-effort propagation of verification context to an
//! external knowledge system.
//!
//! The dispatcher is an outbound message queue, not a held connection:
//! the state machine submits a snapshot and moves on. A background worker
//! attempts delivery at-least-once with capped, time-bounded retries and
//! then drops. Nothing here can block or fail a session transition.

pub mod dispatcher;
pub mod error;
pub mod snapshot;
pub mod transport;

pub use dispatcher::{NeuralDispatcher, SyncHandle};
pub use error::SyncError;
pub use snapshot::ContextSnapshot;
pub use transport::{SyncTransport, WsSyncTransport};
