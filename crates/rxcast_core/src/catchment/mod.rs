//! Spatial parameters of an estimation run: gate-pharmacy detection and
//! the commercial (catchment) radius policy.

mod gate;
mod radius;

pub use gate::{detect_gate, GateOutcome};
pub use radius::{commercial_radius, search_radius_m, RadiusDecision};
