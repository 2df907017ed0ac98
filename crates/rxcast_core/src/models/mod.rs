//! Core data model: facilities, competitors, estimation results.
//!
//! Facility and competitor records are created fresh per estimation run and
//! are not persisted by the core.

mod age;
mod deviation;
mod facility;
mod result;

pub use age::AgeBand;
pub use deviation::{
    calc_deviation, calc_implied_missing_facility, Deviation, DeviationSeverity,
    ImpliedFacilityGap,
};
pub use facility::{
    is_major_chain, CompetingPharmacy, FacilityKind, MedicalFacility, PharmacyType, Provenance,
};
pub use result::{BreakdownRow, Confidence, EstimationResult, MethodId, Reference};
