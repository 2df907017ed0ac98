use thiserror::Error;

/// Errors surfaced by the estimation core.
///
/// Expected edge cases (zero facilities, zero competitors, insufficient
/// calibration samples) are NOT errors; each resolves to a documented
/// default result. Errors here mean a collaborator failed or an input
/// was structurally unusable.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Address could not be resolved to coordinates. Both estimation
    /// models need spatial facility search, so this blocks the whole run.
    #[error("no spatial estimate available, reason=resolution failure: {0}")]
    ResolutionFailed(String),

    #[error("facility search failed: {0}")]
    SearchFailed(String),

    #[error("registry lookup failed: {0}")]
    RegistryFailed(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Calibration batch cancelled before enough samples completed to
    /// support statistics. Cancellation after the floor keeps the
    /// partial batch instead.
    #[error("calibration batch cancelled after {completed} samples")]
    Cancelled { completed: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
