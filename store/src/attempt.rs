//! Attempt-history storage trait.

use crate::StoreError;
use tahaqq_risk::AttemptHistory;

/// Attempt counters per session key.
///
/// Owned exclusively by the store and mutated only through the
/// session-creation path; status polls never write here.
pub trait AttemptStore: Send + Sync {
    /// History for a session key; empty history if the key is new.
    fn get_history(&self, session_key: &str) -> Result<AttemptHistory, StoreError>;

    fn put_history(&self, session_key: &str, history: &AttemptHistory) -> Result<(), StoreError>;
}
