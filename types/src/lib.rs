//! Fundamental types for the Tahaqq verification platform.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: session identifiers, country codes, status enums, the session
//! record itself, regional attachments, device signals, timestamps, and
//! orchestration parameters.

pub mod country;
pub mod device;
pub mod oid;
pub mod params;
pub mod regional;
pub mod session;
pub mod time;

pub use country::CountryCode;
pub use device::{DeviceFingerprint, DeviceSignals};
pub use oid::{OidGenerator, OidParseError, ProviderSessionId, SessionOid};
pub use params::{OrchestrationParams, RiskParams};
pub use regional::{CitizenshipStatus, InsuranceStatus, RegionalAttachment};
pub use session::{FailureReason, SessionStatus, VerificationSession, VerificationType};
pub use time::{Clock, SystemClock, Timestamp};
