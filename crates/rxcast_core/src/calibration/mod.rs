//! Bias calibration against pharmacies with confirmed annual counts.
//!
//! A calibration batch blind-predicts each reference pharmacy with both
//! models (the confirmed figure is withheld from the pipeline), then
//! derives per-band correction multipliers and the MAPE-optimal blend
//! weight from the prediction errors. The resulting statistics are
//! swapped into a shared context; subsequent estimates pick them up
//! without restarting.

mod context;
mod engine;
mod sample;
mod stats;

pub use context::{CalibrationContext, SharedCalibration};
pub use engine::{
    extract_municipality, CalibrationEngine, CalibrationProgress, LocalCalibrationEngine,
    ReferencePharmacy, RegionalCalibrationEngine,
};
pub use sample::CalibrationSample;
pub use stats::{calc_stats, CalibrationStatistics};
