//! Abstract storage for sessions, risk assessments, and attempt history.
//!
//! Every backend implements the traits here; the rest of the workspace
//! depends only on them. Writes are durable-first: the read-through cache
//! in [`cache`] is only updated after the backing store accepts the write.

pub mod assessment;
pub mod attempt;
pub mod cache;
pub mod error;
pub mod memory;
pub mod session;

pub use assessment::AssessmentStore;
pub use attempt::AttemptStore;
pub use cache::CachedSessionStore;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use session::SessionStore;

/// Everything the verification service needs from one backend.
pub trait VerificationStore: SessionStore + AssessmentStore + AttemptStore {}

impl<T: SessionStore + AssessmentStore + AttemptStore> VerificationStore for T {}
