//! # rxcast_core - Pharmacy Prescription-Volume Estimation Engine
//!
//! This library estimates the annual prescription volume of a dispensing
//! pharmacy site from its address and surroundings, using two independent
//! demand models blended into a final figure with an explicit range.
//!
//! ## Features
//! - Method 1: per-facility prescription flow with residual-share capture
//! - Method 2: catchment population demand with age demographics
//! - Fully deterministic given the collaborator inputs
//! - Bias calibration against pharmacies with confirmed annual counts
//! - Narrative traces explaining every figure

// Struct initialization pattern used intentionally
#![allow(clippy::field_reassign_with_default)]

pub mod blend;
pub mod calibration;
pub mod catchment;
pub mod catchment_model;
pub mod congestion;
pub mod density;
pub mod error;
pub mod flow_model;
pub mod geo;
pub mod models;
pub mod params;
pub mod pipeline;
pub mod services;
pub mod specialty;

pub use error::{CoreError, Result};
pub use pipeline::{
    BlindPrediction, EstimationRequest, Estimator, EstimatorConfig, ManualFacility, SiteAssessment,
};

/// Library version, from the crate manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
