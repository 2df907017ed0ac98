//! Population density resolution.
//!
//! This module provides:
//! - `DensityBand`: the single enumerated density partition used by every
//!   band-keyed table in the crate (radius tiers, age distributions,
//!   calibration multipliers). Display labels are derived from the enum and
//!   are never used as lookup keys.
//! - `DensityResolver`: free-text address to population density, resolved
//!   through an ordered cascade of built-in 2020-census tables.

mod band;
mod resolver;

pub use band::DensityBand;
pub use resolver::{DensityLookup, DensityResolver};
