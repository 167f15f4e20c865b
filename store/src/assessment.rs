//! Risk-assessment history storage trait.

use crate::StoreError;
use tahaqq_risk::RiskAssessment;
use tahaqq_types::SessionOid;

/// Append-only risk-assessment history per session.
///
/// There is deliberately no update or delete: every session-creation
/// attempt appends one record so the decision trail stays replayable.
pub trait AssessmentStore: Send + Sync {
    fn append_assessment(
        &self,
        oid: &SessionOid,
        assessment: &RiskAssessment,
    ) -> Result<(), StoreError>;

    /// All assessments for a session, oldest first.
    fn get_assessments(&self, oid: &SessionOid) -> Result<Vec<RiskAssessment>, StoreError>;
}
