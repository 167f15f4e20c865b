//! Regional validator gateway.
//!
//! Adapts a session's country code to the correct external registry call:
//! Saudi sessions validate healthcare facility codes against the NPHIES
//! registry, Sudanese sessions validate wilaya (and optionally ministry)
//! codes against the national-id registry, and every other country passes
//! through untouched.
//!
//! Registry failures degrade, they never silently pass: an unreachable or
//! timed-out registry yields [`GatewayOutcome::Degraded`], which the state
//! machine surfaces on the session instead of aborting it.

pub mod error;
pub mod gateway;
pub mod registry;

pub use error::RegistryError;
pub use gateway::{GatewayOutcome, ValidatorGateway};
pub use registry::{FacilityRecord, HttpRegistry, MinistryRecord, RegionalRegistry, WilayaRecord};
