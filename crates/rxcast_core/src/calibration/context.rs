use std::sync::{Arc, RwLock};

use super::stats::CalibrationStatistics;

/// Shared handle to the current calibration statistics.
///
/// Readers clone an `Arc` snapshot; a finished batch swaps the inner
/// reference in one write. In-flight estimates keep the snapshot they
/// started with.
pub type SharedCalibration = Arc<CalibrationContext>;

#[derive(Debug, Default)]
pub struct CalibrationContext {
    stats: RwLock<Option<Arc<CalibrationStatistics>>>,
}

impl CalibrationContext {
    pub fn new() -> SharedCalibration {
        Arc::new(Self::default())
    }

    /// Snapshot of the current statistics, if a batch has completed.
    pub fn current(&self) -> Option<Arc<CalibrationStatistics>> {
        self.stats.read().expect("calibration lock poisoned").clone()
    }

    /// Install freshly computed statistics.
    pub fn install(&self, stats: CalibrationStatistics) {
        log::info!(
            "installing calibration statistics (n={}, w={:.1})",
            stats.n,
            stats.optimal_m1_weight
        );
        *self.stats.write().expect("calibration lock poisoned") = Some(Arc::new(stats));
    }

    /// Drop the installed statistics, reverting to the heuristic blend.
    pub fn clear(&self) {
        *self.stats.write().expect("calibration lock poisoned") = None;
    }

    pub fn is_calibrated(&self) -> bool {
        self.stats
            .read()
            .expect("calibration lock poisoned")
            .is_some()
    }
}
