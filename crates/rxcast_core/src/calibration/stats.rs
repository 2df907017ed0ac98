//! Error statistics over a calibration batch.
//!
//! Correction multipliers are geometric means of `actual / predicted`:
//! multiplicative errors compose multiplicatively, and the geometric mean
//! is robust to one sample being off by a large factor. Bias is the mean
//! log error with the sign convention that positive means over-prediction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::sample::CalibrationSample;
use crate::density::DensityBand;
use crate::params::CalibrationParams;

/// Learned statistics from one calibration batch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CalibrationStatistics {
    /// Valid samples the statistics are built on.
    pub n: usize,
    /// Mean absolute percentage error of each model alone.
    pub mape_m1: f64,
    pub mape_m2: f64,
    /// MAPE of the blend at the optimal weight.
    pub mape_optimal: f64,
    /// Method 1 weight minimizing blend MAPE over the grid 0.0..=1.0.
    pub optimal_m1_weight: f64,
    /// Mean log error `ln(predicted / actual)`; positive = over-predicts.
    pub bias_m1: f64,
    pub bias_m2: f64,
    /// Per-band correction multipliers (geometric mean of actual/predicted)
    /// with the sample count they are based on.
    pub alpha_m1: HashMap<DensityBand, (f64, usize)>,
    pub alpha_m2: HashMap<DensityBand, (f64, usize)>,
    pub calibrated_at: DateTime<Utc>,
}

/// Compute statistics from a batch of samples.
///
/// Returns `None` below the minimum valid-sample count: statistics from
/// one or two points would swing the blend harder than no statistics at
/// all.
pub fn calc_stats(
    samples: &[CalibrationSample],
    params: &CalibrationParams,
) -> Option<CalibrationStatistics> {
    let valid: Vec<&CalibrationSample> = samples.iter().filter(|s| s.is_valid()).collect();
    if valid.len() < params.min_valid_samples {
        log::warn!(
            "calibration: {} valid of {} samples, need {}; statistics withheld",
            valid.len(),
            samples.len(),
            params.min_valid_samples
        );
        return None;
    }

    let n = valid.len() as f64;
    let mape_m1 = valid.iter().map(|s| s.blend_ape(1.0)).sum::<f64>() / n;
    let mape_m2 = valid.iter().map(|s| s.blend_ape(0.0)).sum::<f64>() / n;

    // log-error helpers; predictions are floored at 1 so ln stays finite
    let log_err = |pred: u32, actual: u32| (pred.max(1) as f64 / actual as f64).ln();
    let bias_m1 = valid.iter().map(|s| log_err(s.m1_rx, s.actual_rx)).sum::<f64>() / n;
    let bias_m2 = valid.iter().map(|s| log_err(s.m2_rx, s.actual_rx)).sum::<f64>() / n;

    // Optimal blend weight by grid search, 0.0 to 1.0 in steps of 0.1.
    let mut optimal_m1_weight = 0.5;
    let mut mape_optimal = f64::INFINITY;
    for step in 0..=10 {
        let w = step as f64 / 10.0;
        let mape = valid.iter().map(|s| s.blend_ape(w)).sum::<f64>() / n;
        if mape < mape_optimal {
            mape_optimal = mape;
            optimal_m1_weight = w;
        }
    }

    let alpha_m1 = band_alphas(&valid, params, |s| s.m1_rx);
    let alpha_m2 = band_alphas(&valid, params, |s| s.m2_rx);

    log::info!(
        "calibration: n={} mape m1={:.1}% m2={:.1}% blend={:.1}% at w={:.1}",
        valid.len(),
        mape_m1 * 100.0,
        mape_m2 * 100.0,
        mape_optimal * 100.0,
        optimal_m1_weight
    );

    Some(CalibrationStatistics {
        n: valid.len(),
        mape_m1,
        mape_m2,
        mape_optimal,
        optimal_m1_weight,
        bias_m1,
        bias_m2,
        alpha_m1,
        alpha_m2,
        calibrated_at: Utc::now(),
    })
}

impl CalibrationStatistics {
    /// Band-corrected point estimates for a model pair. Bands without a
    /// learned multiplier pass through unchanged.
    fn corrected_pair(&self, m1_rx: u32, m2_rx: u32, band: DensityBand) -> (u32, u32) {
        let correct = |raw: u32, alpha: Option<&(f64, usize)>| match alpha {
            Some((a, _)) => (raw as f64 * a) as u32,
            None => raw,
        };
        (
            correct(m1_rx, self.alpha_m1.get(&band)),
            correct(m2_rx, self.alpha_m2.get(&band)),
        )
    }

    /// Apply band corrections and the optimal weight to a pair of raw
    /// model predictions. Returns the corrected blend and a note for the
    /// narrative trace.
    pub fn apply_correction_banded(
        &self,
        m1_rx: u32,
        m2_rx: u32,
        band: DensityBand,
    ) -> (u32, String) {
        let (m1, m2) = self.corrected_pair(m1_rx, m2_rx, band);
        let w = self.optimal_m1_weight;
        let blended = (m1 as f64 * w + m2 as f64 * (1.0 - w)) as u32;
        let note = format!(
            "calibrated: m1 {m1_rx}->{m1}, m2 {m2_rx}->{m2}, w={w:.1} -> {blended}"
        );
        (blended, note)
    }

    /// Same, resolving the band from a raw density. The surface for
    /// re-applying exported statistics outside the pipeline.
    pub fn apply_correction(&self, m1_rx: u32, m2_rx: u32, density: u32) -> (u32, String) {
        self.apply_correction_banded(m1_rx, m2_rx, DensityBand::from_density(density))
    }
}

/// Geometric-mean correction multiplier per density band.
fn band_alphas(
    valid: &[&CalibrationSample],
    params: &CalibrationParams,
    pred: impl Fn(&CalibrationSample) -> u32,
) -> HashMap<DensityBand, (f64, usize)> {
    let mut by_band: HashMap<DensityBand, Vec<f64>> = HashMap::new();
    for s in valid {
        let ratio = s.actual_rx as f64 / pred(s).max(1) as f64;
        by_band.entry(s.band()).or_default().push(ratio.ln());
    }
    by_band
        .into_iter()
        .filter(|(_, logs)| logs.len() >= params.min_band_samples)
        .map(|(band, logs)| {
            let alpha = (logs.iter().sum::<f64>() / logs.len() as f64).exp();
            (band, (alpha, logs.len()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(actual: u32, m1: u32, m2: u32, density: u32) -> CalibrationSample {
        CalibrationSample {
            name: "基準薬局".to_string(),
            address: "東京都".to_string(),
            actual_rx: actual,
            m1_rx: m1,
            m2_rx: m2,
            density,
            n_facilities: 2,
            n_competitors: 1,
            is_gate: false,
            log: vec![],
        }
    }

    #[test]
    fn test_below_minimum_returns_none() {
        let samples = vec![
            sample(10_000, 9_000, 11_000, 5_000),
            sample(8_000, 8_500, 7_000, 5_000),
        ];
        assert!(calc_stats(&samples, &CalibrationParams::default()).is_none());
    }

    #[test]
    fn test_perfect_predictions_identity() {
        // predictions equal to actuals: MAPE 0, bias 0, alpha 1.0
        let samples = vec![
            sample(10_000, 10_000, 10_000, 6_000),
            sample(8_000, 8_000, 8_000, 6_000),
            sample(12_000, 12_000, 12_000, 6_000),
        ];
        let stats = calc_stats(&samples, &CalibrationParams::default()).unwrap();
        assert!(stats.mape_m1.abs() < 1e-9);
        assert!(stats.mape_m2.abs() < 1e-9);
        assert!(stats.mape_optimal.abs() < 1e-9);
        assert!(stats.bias_m1.abs() < 1e-9);
        let (alpha, n) = stats.alpha_m1[&DensityBand::High];
        assert!((alpha - 1.0).abs() < 1e-9);
        assert_eq!(n, 3);
    }

    #[test]
    fn test_systematic_underprediction_gives_alpha_above_one() {
        // method 1 predicts half the actual everywhere
        let samples = vec![
            sample(10_000, 5_000, 10_000, 6_000),
            sample(8_000, 4_000, 8_000, 6_000),
            sample(12_000, 6_000, 12_000, 6_000),
        ];
        let stats = calc_stats(&samples, &CalibrationParams::default()).unwrap();
        let (alpha, _) = stats.alpha_m1[&DensityBand::High];
        assert!((alpha - 2.0).abs() < 1e-9, "alpha {alpha}");
        assert!(stats.bias_m1 < 0.0);
        // method 2 is exact, so the optimal weight leans fully on it
        assert_eq!(stats.optimal_m1_weight, 0.0);
        assert!(stats.mape_optimal < stats.mape_m1);
    }

    #[test]
    fn test_band_with_one_sample_gets_no_alpha() {
        let samples = vec![
            sample(10_000, 9_000, 11_000, 6_000),
            sample(8_000, 8_500, 7_000, 6_000),
            sample(9_000, 9_500, 8_500, 300), // lone ultra-low sample
        ];
        let stats = calc_stats(&samples, &CalibrationParams::default()).unwrap();
        assert!(stats.alpha_m1.contains_key(&DensityBand::High));
        assert!(!stats.alpha_m1.contains_key(&DensityBand::UltraLow));
    }

    #[test]
    fn test_invalid_samples_excluded() {
        let samples = vec![
            sample(10_000, 10_000, 10_000, 6_000),
            sample(0, 9_000, 9_000, 6_000), // no confirmed count
            sample(8_000, 8_000, 8_000, 6_000),
            sample(12_000, 12_000, 12_000, 6_000),
        ];
        let stats = calc_stats(&samples, &CalibrationParams::default()).unwrap();
        assert_eq!(stats.n, 3);
        assert!(stats.mape_m1.abs() < 1e-9);
    }

    #[test]
    fn test_apply_correction_uses_band_alpha() {
        let samples = vec![
            sample(10_000, 5_000, 10_000, 6_000),
            sample(8_000, 4_000, 8_000, 6_000),
            sample(12_000, 6_000, 12_000, 6_000),
        ];
        let stats = calc_stats(&samples, &CalibrationParams::default()).unwrap();
        // optimal weight 0.0, so the corrected m1 does not matter here;
        // a band without samples leaves predictions uncorrected
        let (blended, _) = stats.apply_correction(5_000, 9_000, 6_000);
        assert_eq!(blended, 9_000);
        let (blended_other_band, _) = stats.apply_correction(5_000, 9_000, 300);
        assert_eq!(blended_other_band, 9_000);
    }

    #[test]
    fn test_optimal_weight_found_on_grid() {
        // m1 over-predicts by 20%, m2 under-predicts by 20%; the best
        // blend sits at w = 0.5 where the errors cancel
        let samples = vec![
            sample(10_000, 12_000, 8_000, 6_000),
            sample(5_000, 6_000, 4_000, 6_000),
            sample(20_000, 24_000, 16_000, 6_000),
        ];
        let stats = calc_stats(&samples, &CalibrationParams::default()).unwrap();
        assert_eq!(stats.optimal_m1_weight, 0.5);
        assert!(stats.mape_optimal < 1e-9);
    }
}
