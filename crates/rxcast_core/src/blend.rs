//! Blending the two model outputs.
//!
//! The smart blend weights Method 1 (facility flow) against Method 2
//! (catchment population) from observable signals: population density,
//! how many facilities were found, and how many of those carry confirmed
//! outpatient counts. When calibration statistics are available, the
//! learned optimal weight and per-band bias corrections replace the
//! heuristic.

use std::sync::Arc;

use crate::calibration::CalibrationStatistics;
use crate::density::DensityBand;
use crate::models::{Confidence, EstimationResult, MethodId};
use crate::params::BlendParams;

/// The chosen Method 1 weight and how it was derived.
#[derive(Debug, Clone)]
pub struct BlendDecision {
    /// Weight on Method 1; Method 2 gets the complement.
    pub m1_weight: f64,
    pub rationale: Vec<String>,
    /// Set when calibration statistics drove the weight.
    pub calibrated: bool,
}

/// Heuristic Method 1 weight from run signals.
///
/// Dense urban areas favor Method 2 (flows fragment across many outlets);
/// a rich, well-confirmed facility picture favors Method 1. The result is
/// clamped so neither model is ever silenced.
pub fn smart_blend_weight(
    params: &BlendParams,
    density: u32,
    n_facilities: usize,
    n_confirmed: usize,
) -> BlendDecision {
    let mut w = params.base_weight;
    let mut rationale = vec![format!("base weight {:.2}", params.base_weight)];

    if density > 10_000 {
        w += params.ultra_dense_shift;
        rationale.push(format!(
            "ultra-dense area ({density}/km2): {:+.2}",
            params.ultra_dense_shift
        ));
    } else if density > 5_000 {
        w += params.dense_shift;
        rationale.push(format!("dense area ({density}/km2): {:+.2}", params.dense_shift));
    } else if density < 500 {
        w += params.sparse_shift;
        rationale.push(format!("sparse area ({density}/km2): {:+.2}", params.sparse_shift));
    }

    if n_facilities >= 10 {
        w += params.many_facilities_shift;
        rationale.push(format!(
            "{n_facilities} facilities found: {:+.2}",
            params.many_facilities_shift
        ));
    } else if n_facilities >= 5 {
        w += params.some_facilities_shift;
        rationale.push(format!(
            "{n_facilities} facilities found: {:+.2}",
            params.some_facilities_shift
        ));
    } else if n_facilities < 3 {
        w += params.few_facilities_shift;
        rationale.push(format!(
            "{n_facilities} facility(ies) found: {:+.2}",
            params.few_facilities_shift
        ));
    }

    if n_confirmed >= 3 {
        w += params.confirmed_many_shift;
        rationale.push(format!(
            "{n_confirmed} confirmed outpatient counts: {:+.2}",
            params.confirmed_many_shift
        ));
    } else if n_confirmed >= 1 {
        w += params.confirmed_some_shift;
        rationale.push(format!(
            "{n_confirmed} confirmed outpatient count(s): {:+.2}",
            params.confirmed_some_shift
        ));
    }

    let clamped = w.clamp(params.min_weight, params.max_weight);
    if (clamped - w).abs() > 1e-12 {
        rationale.push(format!(
            "clamped to [{:.2}, {:.2}]",
            params.min_weight, params.max_weight
        ));
    }
    rationale.push(format!("method 1 weight {clamped:.2}"));
    BlendDecision {
        m1_weight: clamped,
        rationale,
        calibrated: false,
    }
}

/// Calibrated weight and per-band bias correction.
///
/// Each model's point estimate is first multiplied by the band's learned
/// correction factor (when the band had enough samples), then blended with
/// the MAPE-optimal weight found during calibration.
pub fn calibrated_blend_weight(stats: &CalibrationStatistics, band: DensityBand) -> BlendDecision {
    let mut rationale = vec![format!(
        "calibrated weight {:.2} (MAPE m1 {:.1}% / m2 {:.1}% / blend {:.1}%, n={})",
        stats.optimal_m1_weight,
        stats.mape_m1 * 100.0,
        stats.mape_m2 * 100.0,
        stats.mape_optimal * 100.0,
        stats.n
    )];
    if let Some((alpha, n)) = stats.alpha_m1.get(&band) {
        rationale.push(format!(
            "{} band method 1 correction x{alpha:.3} ({n} samples)",
            band.label_long()
        ));
    }
    if let Some((alpha, n)) = stats.alpha_m2.get(&band) {
        rationale.push(format!(
            "{} band method 2 correction x{alpha:.3} ({n} samples)",
            band.label_long()
        ));
    }
    BlendDecision {
        m1_weight: stats.optimal_m1_weight,
        rationale,
        calibrated: true,
    }
}

/// Blend the two model results into the final estimate.
///
/// With calibration statistics, each model's point estimate is corrected
/// by its band multiplier before blending. The blended range is the
/// weighted combination of the inputs' ranges; confidence is the higher
/// of the two inputs, bumped one notch when calibration applied.
pub fn blend(
    m1: &EstimationResult,
    m2: &EstimationResult,
    decision: &BlendDecision,
    stats: Option<&Arc<CalibrationStatistics>>,
    band: DensityBand,
) -> EstimationResult {
    let w = decision.m1_weight;
    // The calibrated decision carries the statistics' optimal weight, so
    // the delegated blend below agrees with `decision.m1_weight`.
    let (annual, blend_note) = match stats {
        Some(s) => s.apply_correction_banded(m1.annual_rx, m2.annual_rx, band),
        None => {
            let annual = (m1.annual_rx as f64 * w + m2.annual_rx as f64 * (1.0 - w)) as u32;
            let note = format!(
                "blend: {} x {w:.2} + {} x {:.2} = {annual} rx/year",
                m1.annual_rx,
                m2.annual_rx,
                1.0 - w
            );
            (annual, note)
        }
    };
    let low = (m1.low as f64 * w + m2.low as f64 * (1.0 - w)) as u32;
    let high = (m1.high as f64 * w + m2.high as f64 * (1.0 - w)) as u32;

    let mut confidence = m1.confidence.max(m2.confidence);
    if decision.calibrated && confidence < Confidence::High {
        confidence = match confidence {
            Confidence::Low => Confidence::Medium,
            _ => Confidence::High,
        };
    }

    let mut trace = decision.rationale.clone();
    trace.push(blend_note);

    let mut breakdown = m1.breakdown.clone();
    breakdown.extend(m2.breakdown.iter().cloned());
    let mut references = m1.references.clone();
    for r in &m2.references {
        if !references.iter().any(|x| x.name == r.name) {
            references.push(r.clone());
        }
    }

    EstimationResult {
        method: MethodId::Blend,
        annual_rx: annual,
        low: low.min(annual),
        high: high.max(annual),
        confidence,
        daily_rx: (annual as f64 / crate::params::NATIONAL_STATS.working_days as f64) as u32,
        breakdown,
        trace,
        references,
    }
}
