//! Country dispatch and validation outcomes.

use crate::error::RegistryError;
use crate::registry::RegionalRegistry;
use std::sync::Arc;
use std::time::Duration;
use tahaqq_types::{CountryCode, RegionalAttachment};
use tracing::warn;

/// Result of validating one regional attachment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// Every supplied code checked out; the attachment was normalized and
    /// marked valid.
    Valid,
    /// A supplied code is unknown, inactive, or does not belong to the
    /// session's country. Hard failure: the caller rejects the request.
    Invalid { reason: &'static str },
    /// The registry could not answer within budget. Soft failure: the
    /// session proceeds flagged as degraded.
    Degraded { reason: &'static str },
}

impl GatewayOutcome {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Validates regional attachments against the country's registry.
pub struct ValidatorGateway {
    registry: Arc<dyn RegionalRegistry>,
    /// Overall budget for one validation; a timeout degrades.
    timeout: Duration,
}

impl ValidatorGateway {
    pub fn new(registry: Arc<dyn RegionalRegistry>, timeout_ms: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Validate `attachment` for `country`, normalizing codes in place and
    /// setting `is_valid`. Never blocks past the configured budget.
    pub async fn validate(
        &self,
        country: &CountryCode,
        attachment: &mut RegionalAttachment,
    ) -> GatewayOutcome {
        if !attachment.matches_country(country) {
            attachment.set_valid(false);
            return GatewayOutcome::Invalid {
                reason: "context_country_mismatch",
            };
        }

        normalize(attachment);

        let outcome = match tokio::time::timeout(self.timeout, self.check(attachment)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(country = %country, kind = attachment.kind(), "regional registry timed out");
                GatewayOutcome::Degraded {
                    reason: "registry_unavailable",
                }
            }
        };

        attachment.set_valid(outcome == GatewayOutcome::Valid);
        outcome
    }

    async fn check(&self, attachment: &RegionalAttachment) -> GatewayOutcome {
        match attachment {
            RegionalAttachment::Healthcare { facility_code, .. } => {
                match facility_code {
                    // Healthcare context is optional unless a code is supplied.
                    None => GatewayOutcome::Valid,
                    Some(code) => match self.registry.facility(code).await {
                        Ok(facility) if facility.active && facility.certified => {
                            GatewayOutcome::Valid
                        }
                        Ok(facility) if !facility.active => GatewayOutcome::Invalid {
                            reason: "facility_inactive",
                        },
                        Ok(_) => GatewayOutcome::Invalid {
                            reason: "facility_not_certified",
                        },
                        Err(e) => lookup_failure(e, "unknown_facility"),
                    },
                }
            }
            RegionalAttachment::NationalId {
                wilaya_code,
                ministry_code,
                ..
            } => {
                match self.registry.wilaya(wilaya_code).await {
                    Ok(wilaya) if wilaya.active => {}
                    Ok(_) => {
                        return GatewayOutcome::Invalid {
                            reason: "wilaya_inactive",
                        }
                    }
                    Err(e) => return lookup_failure(e, "unknown_wilaya"),
                }

                if let Some(code) = ministry_code {
                    match self.registry.ministry(code).await {
                        Ok(ministry) if ministry.active => {}
                        Ok(_) => {
                            return GatewayOutcome::Invalid {
                                reason: "ministry_inactive",
                            }
                        }
                        Err(e) => return lookup_failure(e, "unknown_ministry"),
                    }
                }

                GatewayOutcome::Valid
            }
        }
    }
}

/// Unknown codes reject; everything else is the registry's problem and
/// degrades rather than failing the session.
fn lookup_failure(e: RegistryError, not_found_reason: &'static str) -> GatewayOutcome {
    match e {
        RegistryError::NotFound(_) => GatewayOutcome::Invalid {
            reason: not_found_reason,
        },
        RegistryError::Unavailable(msg) | RegistryError::Malformed(msg) => {
            warn!(error = %msg, "regional registry lookup failed");
            GatewayOutcome::Degraded {
                reason: "registry_unavailable",
            }
        }
    }
}

fn normalize(attachment: &mut RegionalAttachment) {
    let tidy = |code: &mut String| {
        *code = code.trim().to_ascii_uppercase();
    };
    match attachment {
        RegionalAttachment::Healthcare {
            facility_code,
            practitioner_id,
            ..
        } => {
            if let Some(code) = facility_code {
                tidy(code);
            }
            if let Some(id) = practitioner_id {
                tidy(id);
            }
        }
        RegionalAttachment::NationalId {
            wilaya_code,
            ministry_code,
            ..
        } => {
            tidy(wilaya_code);
            if let Some(code) = ministry_code {
                tidy(code);
            }
        }
    }
}
