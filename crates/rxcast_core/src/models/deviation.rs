//! Actual-vs-predicted comparison helpers.
//!
//! These consume a registry-confirmed annual count for display and gap
//! analysis. They are never part of the blind prediction path.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::params::NATIONAL_STATS;
use crate::specialty::Specialty;

/// How far a prediction deviates from a confirmed actual count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum DeviationSeverity {
    /// |deviation| < 20 %
    Normal,
    /// 20 % ≤ |deviation| < 50 %
    Notable,
    /// |deviation| ≥ 50 %
    Severe,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Deviation {
    /// Signed percentage, (predicted − actual) / actual × 100.
    pub percent: f64,
    pub severity: DeviationSeverity,
}

/// Relative deviation of a prediction from an actual count.
/// `None` when the actual count is not positive.
pub fn calc_deviation(actual: u32, predicted: u32) -> Option<Deviation> {
    if actual == 0 {
        return None;
    }
    let percent = (predicted as f64 - actual as f64) / actual as f64 * 100.0;
    let severity = if percent.abs() < 20.0 {
        DeviationSeverity::Normal
    } else if percent.abs() < 50.0 {
        DeviationSeverity::Notable
    } else {
        DeviationSeverity::Severe
    };
    Some(Deviation { percent, severity })
}

/// Size of a medical facility that would explain an under-prediction gap.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImpliedFacilityGap {
    pub gap_annual: u32,
    pub gap_daily: f64,
    /// Daily outpatients of an undetected general-internal clinic that
    /// would close the gap.
    pub implied_daily_outpatients: u32,
    pub gap_percent: f64,
}

/// Back-solve the scale of an undetected medical facility from the gap
/// between Method 1's prediction and the confirmed actual count.
///
/// Gaps under 20 % of the actual are within model tolerance and return
/// `None`. The back-solve assumes a general-internal clinic (the most
/// common case) and the national dispensing rate.
pub fn calc_implied_missing_facility(actual_rx: u32, predicted_rx: u32) -> Option<ImpliedFacilityGap> {
    if actual_rx == 0 || predicted_rx as f64 >= actual_rx as f64 * 0.8 {
        return None;
    }
    let gap_annual = actual_rx - predicted_rx;
    let gap_daily = gap_annual as f64 / NATIONAL_STATS.working_days as f64;
    let rx_rate = Specialty::GeneralInternal.rx_rate();
    let implied = gap_daily / (rx_rate * NATIONAL_STATS.dispensing_rate);
    Some(ImpliedFacilityGap {
        gap_annual,
        gap_daily,
        implied_daily_outpatients: implied as u32,
        gap_percent: gap_annual as f64 / actual_rx as f64 * 100.0,
    })
}
