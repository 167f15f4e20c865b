//! Session record storage trait.

use crate::StoreError;
use tahaqq_types::{CountryCode, ProviderSessionId, SessionOid, Timestamp, VerificationSession};

/// Durable storage for [`VerificationSession`] records.
///
/// `put_session` is a compare-and-swap on the record's `version`: the
/// write succeeds only when the stored version matches the one the caller
/// loaded, and the stored copy is bumped to `version + 1`. This is the
/// per-session serialization point — concurrent writers referencing the
/// same OID lose with [`StoreError::VersionConflict`] and must re-read.
pub trait SessionStore: Send + Sync {
    /// Insert or CAS-update a session. Returns the new stored version.
    fn put_session(&self, session: &VerificationSession) -> Result<u64, StoreError>;

    fn get_by_oid(&self, oid: &SessionOid) -> Result<VerificationSession, StoreError>;

    fn get_by_provider_id(
        &self,
        id: &ProviderSessionId,
    ) -> Result<VerificationSession, StoreError>;

    /// Reporting: sessions for one country created within `[from, to)`.
    fn list_by_country_and_range(
        &self,
        country: &CountryCode,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<VerificationSession>, StoreError>;

    /// Sessions not yet in a terminal state, for the expiry sweep.
    fn list_non_terminal(&self) -> Result<Vec<VerificationSession>, StoreError>;
}
