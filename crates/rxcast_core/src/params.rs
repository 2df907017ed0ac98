//! Named model parameters.
//!
//! Every heuristic constant used by the estimation models lives here,
//! grouped by model, instead of being scattered inline. All parameter
//! structs implement `Default` with the documented values and can be
//! overridden per model instance.

use crate::density::DensityBand;
use crate::models::AgeBand;

/// National dispensing statistics (ministry dispensing-cost survey, 2022).
#[derive(Debug, Clone, Copy)]
pub struct NationalStats {
    /// Annual prescriptions filled at outside pharmacies nationwide.
    pub total_prescriptions: u64,
    /// Number of dispensing pharmacies nationwide.
    pub total_pharmacies: u32,
    /// Mean annual prescriptions per pharmacy.
    pub average_annual_rx: u32,
    /// Estimated median annual prescriptions per pharmacy. The size
    /// distribution is heavily skewed, so the median sits well under the
    /// mean; it serves as the no-data fallback for Method 1.
    pub median_annual_rx: u32,
    /// Working days per year (weekends, holidays, year-end excluded).
    pub working_days: u32,
    /// Fraction of prescriptions filled at an outside pharmacy rather
    /// than in-house ("dispensing rate", 2022 national average).
    pub dispensing_rate: f64,
    /// Prescriptions issued per outpatient visit (medical only, dental
    /// excluded; specialty-share weighted average).
    pub prescription_per_visit: f64,
}

pub const NATIONAL_STATS: NationalStats = NationalStats {
    total_prescriptions: 885_000_000,
    total_pharmacies: 61_860,
    average_annual_rx: 14_305,
    median_annual_rx: 8_000,
    working_days: 305,
    dispensing_rate: 0.790,
    prescription_per_visit: 0.69,
};

/// Method 1 (nearby-facility flow model) parameters.
#[derive(Debug, Clone)]
pub struct FlowModelParams {
    /// Share of a facility's prescriptions captured by one adjacent gate
    /// pharmacy (industry surveys put the range at 60–80 %; median used).
    pub gate_capture_rate: f64,
    /// Additional capture per extra gate pharmacy at the same facility.
    pub gate_capture_step: f64,
    /// Joint capture ceiling across all gate pharmacies.
    pub gate_capture_cap: f64,
    /// A competitor within this distance of a facility counts as its
    /// gate pharmacy, meters.
    pub gate_radius_m: f64,
    /// Competitors within this distance of a facility join the
    /// inverse-distance split, meters.
    pub huff_radius_m: f64,
    /// Floor for inverse-distance weights: `w = 1 / max(d, this)`.
    pub min_huff_distance_m: f64,
    /// Distance-tier baseline shares when no gate pharmacy exists:
    /// (max distance in meters, share). Beyond the last tier,
    /// `far_share` applies.
    pub tier_shares: [(f64, f64); 3],
    pub far_share: f64,
    /// Hard cap on the final capture share.
    pub share_cap: f64,
    /// Damping when the facility dispenses in-house.
    pub inhouse_dispensary_factor: f64,
    /// Estimate range brackets, multiplied onto the point estimate.
    pub range_low: f64,
    pub range_high: f64,
}

impl Default for FlowModelParams {
    fn default() -> Self {
        Self {
            gate_capture_rate: 0.70,
            gate_capture_step: 0.05,
            gate_capture_cap: 0.85,
            gate_radius_m: 50.0,
            huff_radius_m: 300.0,
            min_huff_distance_m: 10.0,
            tier_shares: [(50.0, 0.75), (150.0, 0.50), (300.0, 0.30)],
            far_share: 0.15,
            share_cap: 0.90,
            inhouse_dispensary_factor: 0.6,
            range_low: 0.6,
            range_high: 1.8,
        }
    }
}

/// Method 2 (catchment-population model) parameters.
#[derive(Debug, Clone)]
pub struct CatchmentModelParams {
    /// Market-share floor even in saturated markets.
    pub share_floor: f64,
    /// Market-share ceiling for standalone/clinic-attached pharmacies
    /// (the remainder leaks out of the catchment).
    pub share_cap: f64,
    /// Market-share ceiling for supermarket-embedded pharmacies.
    /// Prescriptions gravitate to pharmacies near the prescribing doctor,
    /// leaving the supermarket pharmacy a complementary role. An
    /// informally justified default, overridable, not calibration-derived.
    pub supermarket_share_cap: f64,
    /// Multiplier on the inflow coefficient for supermarket-embedded
    /// pharmacies: store foot traffic is not prescription-bearing traffic.
    /// Chronic prescriptions (~65 %) stay with habitual pharmacies; only
    /// acute/opportunistic ones (~35 %, captured at ~60 %) are in play.
    /// Also an overridable, informally justified default.
    pub supermarket_inflow_ratio: f64,
    /// Effective-competitor weights by distance tier.
    pub near_weight: f64,
    pub near_radius_m: f64,
    pub mid_weight: f64,
    pub mid_radius_m: f64,
    pub far_weight: f64,
    /// A competitor within this distance of a medical facility is
    /// "gate-like" and weighs `gate_like_boost` times more.
    pub gate_like_radius_m: f64,
    pub gate_like_boost: f64,
    /// Estimate range brackets.
    pub range_low: f64,
    pub range_high: f64,
}

impl Default for CatchmentModelParams {
    fn default() -> Self {
        Self {
            share_floor: 0.08,
            share_cap: 0.80,
            supermarket_share_cap: 0.55,
            supermarket_inflow_ratio: 0.40,
            near_weight: 1.5,
            near_radius_m: 200.0,
            mid_weight: 1.0,
            mid_radius_m: 500.0,
            far_weight: 0.5,
            gate_like_radius_m: 100.0,
            gate_like_boost: 5.0 / 3.0,
            range_low: 0.55,
            range_high: 1.80,
        }
    }
}

impl CatchmentModelParams {
    /// Net external-demand multiplier on the catchment-resident pool:
    /// commuters, visitors and patients of nearby facilities bring
    /// prescriptions in; some residents fill theirs near work. The net
    /// is largest in dense urban cores.
    pub fn inflow_coefficient(&self, band: DensityBand) -> f64 {
        match band {
            DensityBand::UltraHigh => 1.60,
            DensityBand::High => 1.40,
            DensityBand::Mid => 1.25,
            DensityBand::Low => 1.12,
            DensityBand::UltraLow => 1.05,
        }
    }

    /// Age distribution by density band. Denser areas skew younger
    /// (working-age singles); sparse areas skew older. Order matches
    /// `AgeBand::ALL`.
    pub fn age_distribution(&self, band: DensityBand) -> [(AgeBand, f64); 5] {
        let shares = match band {
            DensityBand::UltraHigh => [0.100, 0.400, 0.260, 0.130, 0.110],
            DensityBand::High => [0.112, 0.368, 0.260, 0.140, 0.120],
            // National-average composition.
            DensityBand::Mid => [0.119, 0.342, 0.256, 0.145, 0.138],
            DensityBand::Low => [0.115, 0.295, 0.255, 0.175, 0.160],
            DensityBand::UltraLow => [0.100, 0.255, 0.245, 0.200, 0.200],
        };
        [
            (AgeBand::Child, shares[0]),
            (AgeBand::YoungAdult, shares[1]),
            (AgeBand::MiddleAge, shares[2]),
            (AgeBand::EarlySenior, shares[3]),
            (AgeBand::LateSenior, shares[4]),
        ]
    }
}

/// Congestion adjuster parameters.
#[derive(Debug, Clone)]
pub struct CongestionParams {
    /// Damping starts at this many unconfirmed facilities.
    pub threshold: usize,
    /// Exponential decay rate per facility beyond `threshold − 1`.
    pub decay_rate: f64,
    /// Damping factor floor.
    pub factor_floor: f64,
    /// Per-facility daily outpatient floor after damping.
    pub min_daily_outpatients: u32,
}

impl Default for CongestionParams {
    fn default() -> Self {
        Self {
            threshold: 6,
            decay_rate: 0.035,
            factor_floor: 0.50,
            min_daily_outpatients: 5,
        }
    }
}

/// Smart-blend (uncalibrated weighting) parameters.
#[derive(Debug, Clone)]
pub struct BlendParams {
    pub base_weight: f64,
    /// Density signals (strict thresholds).
    pub ultra_dense_shift: f64,
    pub dense_shift: f64,
    pub sparse_shift: f64,
    /// Facility-count signals.
    pub many_facilities_shift: f64,
    pub some_facilities_shift: f64,
    pub few_facilities_shift: f64,
    /// Confirmed-facility signals.
    pub confirmed_many_shift: f64,
    pub confirmed_some_shift: f64,
    /// Final clamp on the Method 1 weight.
    pub min_weight: f64,
    pub max_weight: f64,
}

impl Default for BlendParams {
    fn default() -> Self {
        Self {
            base_weight: 0.50,
            ultra_dense_shift: -0.12,
            dense_shift: -0.07,
            sparse_shift: 0.08,
            many_facilities_shift: 0.12,
            some_facilities_shift: 0.07,
            few_facilities_shift: -0.08,
            confirmed_many_shift: 0.08,
            confirmed_some_shift: 0.04,
            min_weight: 0.30,
            max_weight: 0.70,
        }
    }
}

/// Calibration engine parameters.
#[derive(Debug, Clone)]
pub struct CalibrationParams {
    /// Samples below this confirmed annual count are excluded at
    /// collection time.
    pub min_annual_rx: u32,
    /// Collection stops at this many usable samples.
    pub max_samples: usize,
    /// Statistics are undefined below this many valid samples.
    pub min_valid_samples: usize,
    /// A band's correction multiplier is defined only with at least this
    /// many samples in the band.
    pub min_band_samples: usize,
    /// Cooperative inter-call delay between samples, milliseconds.
    /// External services are rate limited; the batch throttles itself.
    pub throttle_ms: u64,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            min_annual_rx: 1_000,
            max_samples: 30,
            min_valid_samples: 3,
            min_band_samples: 2,
            throttle_ms: 800,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_distributions_sum_to_one() {
        let p = CatchmentModelParams::default();
        for band in DensityBand::ALL {
            let total: f64 = p.age_distribution(band).iter().map(|(_, s)| s).sum();
            assert!((total - 1.0).abs() < 1e-9, "{band:?} sums to {total}");
        }
    }

    #[test]
    fn test_inflow_rises_with_density() {
        let p = CatchmentModelParams::default();
        let mut prev = 0.0;
        for band in DensityBand::ALL {
            let c = p.inflow_coefficient(band);
            assert!(c > prev, "{band:?}");
            prev = c;
        }
    }

    #[test]
    fn test_denser_bands_skew_younger() {
        let p = CatchmentModelParams::default();
        let elderly = |band| {
            p.age_distribution(band)
                .iter()
                .filter(|(a, _)| matches!(a, AgeBand::EarlySenior | AgeBand::LateSenior))
                .map(|(_, s)| s)
                .sum::<f64>()
        };
        assert!(elderly(DensityBand::UltraHigh) < elderly(DensityBand::Mid));
        assert!(elderly(DensityBand::Mid) < elderly(DensityBand::UltraLow));
    }
}
