//! Method 2: catchment-population model.
//!
//! The disc of the commercial radius holds `π r² × density` residents.
//! Each age band's share of that population, times its annual outpatient
//! visit rate, times prescriptions per visit and the national dispensing
//! rate, yields the catchment's annual prescription pool. An inflow
//! coefficient adds net external demand (commuters, visitors), then the
//! target pharmacy takes a market share of the pool based on the
//! effective number of competitors.
//!
//! The model sees no individual facility flows, so its confidence is
//! always Low; it serves as the demand-side cross-check on Method 1.

use crate::density::DensityBand;
use crate::geo::{haversine_m, Coordinates};
use crate::models::{
    BreakdownRow, CompetingPharmacy, Confidence, EstimationResult, MedicalFacility, MethodId,
    PharmacyType, Reference,
};
use crate::params::{CatchmentModelParams, NATIONAL_STATS};

pub struct CatchmentPopulationModel {
    params: CatchmentModelParams,
}

impl Default for CatchmentPopulationModel {
    fn default() -> Self {
        Self::new(CatchmentModelParams::default())
    }
}

impl CatchmentPopulationModel {
    pub fn new(params: CatchmentModelParams) -> Self {
        Self { params }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn predict(
        &self,
        pharmacy: Coordinates,
        pharmacy_type: PharmacyType,
        density: u32,
        radius_m: u32,
        facilities: &[MedicalFacility],
        competitors: &[CompetingPharmacy],
    ) -> EstimationResult {
        let p = &self.params;
        let band = DensityBand::from_density(density);
        let radius_km = radius_m as f64 / 1_000.0;
        let population = std::f64::consts::PI * radius_km * radius_km * density as f64;

        let mut trace = vec![
            "method 2: catchment population demand".to_string(),
            format!(
                "radius {radius_m}m x density {density}/km2 = catchment population {:.0}",
                population
            ),
        ];

        // Demand pool from resident demographics.
        let mut breakdown = Vec::new();
        let mut pool_annual_rx = 0.0f64;
        for (age, share) in p.age_distribution(band) {
            let band_pop = population * share;
            let annual_visits = band_pop * age.annual_visit_rate();
            let annual_rx = annual_visits
                * NATIONAL_STATS.prescription_per_visit
                * NATIONAL_STATS.dispensing_rate;
            pool_annual_rx += annual_rx;
            breakdown.push(BreakdownRow::AgeBand {
                band: age,
                population: band_pop as u32,
                annual_visit_rate: age.annual_visit_rate(),
                annual_visits: annual_visits as u64,
                annual_rx: annual_rx as u64,
            });
        }
        trace.push(format!(
            "resident demand pool: {:.0} rx/year ({} band age mix)",
            pool_annual_rx,
            band.label_long()
        ));

        // Net external inflow.
        let mut inflow = p.inflow_coefficient(band);
        if pharmacy_type == PharmacyType::SupermarketEmbedded {
            inflow *= p.supermarket_inflow_ratio;
            trace.push(format!(
                "inflow coefficient {:.2} x supermarket ratio {:.2} = {inflow:.2}",
                p.inflow_coefficient(band),
                p.supermarket_inflow_ratio
            ));
        } else {
            trace.push(format!("inflow coefficient {inflow:.2} ({} band)", band.label_long()));
        }
        let market = pool_annual_rx * inflow;

        // Market share against the effective competitor count.
        let cap = match pharmacy_type {
            PharmacyType::SupermarketEmbedded => p.supermarket_share_cap,
            _ => p.share_cap,
        };
        let (share, share_note) = self.market_share(pharmacy, facilities, competitors, cap);
        trace.push(share_note);

        let annual = (market * share) as u32;
        trace.push(format!(
            "market {:.0} x share {:.1}% = {annual} rx/year",
            market,
            share * 100.0
        ));

        EstimationResult {
            method: MethodId::CatchmentPopulation,
            annual_rx: annual,
            low: (annual as f64 * p.range_low) as u32,
            high: (annual as f64 * p.range_high) as u32,
            confidence: Confidence::Low,
            daily_rx: annual / NATIONAL_STATS.working_days,
            breakdown,
            trace,
            references: references(),
        }
    }

    /// Share of the catchment's prescription pool the target pharmacy takes.
    ///
    /// Competitors are weighted by distance from the target (closer rivals
    /// hurt more) and boosted when they sit gate-like next to a medical
    /// facility. With zero competitors the share is the cap itself, not 1.0:
    /// some demand always leaks out of the catchment.
    fn market_share(
        &self,
        pharmacy: Coordinates,
        facilities: &[MedicalFacility],
        competitors: &[CompetingPharmacy],
        cap: f64,
    ) -> (f64, String) {
        let p = &self.params;
        if competitors.is_empty() {
            return (
                cap,
                format!("no competitors in range: share at cap {:.0}%", cap * 100.0),
            );
        }
        let mut effective = 0.0f64;
        for comp in competitors {
            let d = haversine_m(pharmacy, comp.coords);
            let mut w = if d <= p.near_radius_m {
                p.near_weight
            } else if d <= p.mid_radius_m {
                p.mid_weight
            } else {
                p.far_weight
            };
            let gate_like = facilities
                .iter()
                .any(|f| haversine_m(f.coords, comp.coords) <= p.gate_like_radius_m);
            if gate_like {
                w *= p.gate_like_boost;
            }
            effective += w;
        }
        let share = (1.0 / (effective + 1.0)).clamp(p.share_floor, cap);
        (
            share,
            format!(
                "{} competitor(s), effective count {effective:.2}: share {:.1}%",
                competitors.len(),
                share * 100.0
            ),
        )
    }
}

fn references() -> Vec<Reference> {
    vec![
        Reference::new(
            "MHLW patient survey 2020",
            "annual outpatient visit rates by age band",
            "https://www.mhlw.go.jp/toukei/saikin/hw/kanja/20/",
        ),
        Reference::new(
            "MHLW dispensing-cost trends FY2022",
            "prescriptions per visit and national dispensing rate",
            "https://www.mhlw.go.jp/topics/medias/med/",
        ),
    ]
}
