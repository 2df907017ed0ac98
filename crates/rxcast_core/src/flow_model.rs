//! Method 1: nearby-facility flow model.
//!
//! Each nearby medical facility emits `daily outpatients × specialty
//! prescription rate × national dispensing rate` prescriptions per day to
//! outside pharmacies (×0.6 when it dispenses in-house). The target
//! pharmacy captures a share of each facility's flow; summed daily flows ×
//! 305 working days give the annual estimate.
//!
//! Capture share uses a residual-share model: competitors within 50 m of a
//! facility are its gate pharmacies and jointly take 70 % (+5 pp per extra
//! gate, capped at 85 %); the residual splits between the target and
//! non-gate competitors within 300 m by inverse-distance (Huff) weights.
//! Without gate pharmacies, a distance-tier baseline applies, discounted by
//! the same inverse-distance split. The final share never exceeds 0.90.
//!
//! An earlier revision applied the tier baseline AND the Huff split on top
//! of a gate discount, double-discounting to 1–2 % shares; the residual
//! model replaced it.

use crate::geo::{haversine_m, Coordinates};
use crate::models::{
    BreakdownRow, CompetingPharmacy, Confidence, EstimationResult, MedicalFacility, MethodId,
    Reference,
};
use crate::params::{FlowModelParams, NATIONAL_STATS};

pub struct FacilityFlowModel {
    params: FlowModelParams,
}

impl Default for FacilityFlowModel {
    fn default() -> Self {
        Self::new(FlowModelParams::default())
    }
}

impl FacilityFlowModel {
    pub fn new(params: FlowModelParams) -> Self {
        Self { params }
    }

    pub fn predict(
        &self,
        pharmacy: Coordinates,
        facilities: &[MedicalFacility],
        competitors: &[CompetingPharmacy],
    ) -> EstimationResult {
        let mut breakdown = Vec::new();
        let mut trace = vec![
            "method 1: per-facility prescription inflow, residual-share capture".to_string(),
            format!("facilities in scope: {}", facilities.len()),
        ];
        let mut total_daily = 0.0f64;

        for fac in facilities {
            if fac.daily_outpatients == 0 {
                continue;
            }
            let rx_rate = fac.specialty.rx_rate();
            let mut daily_dispensed =
                fac.daily_outpatients as f64 * rx_rate * NATIONAL_STATS.dispensing_rate;
            if fac.has_inhouse_dispensary {
                daily_dispensed *= self.params.inhouse_dispensary_factor;
            }
            let (share, share_reason) = self.capture_share(fac, pharmacy, competitors);
            let daily_flow = daily_dispensed * share;
            total_daily += daily_flow;
            trace.push(format!(
                "{} ({:.0}m): {}/day x {:.0}% x {:.1}% x {:.0}% = {:.1} rx/day",
                fac.name,
                fac.distance_m,
                fac.daily_outpatients,
                rx_rate * 100.0,
                NATIONAL_STATS.dispensing_rate * 100.0,
                share * 100.0,
                daily_flow,
            ));
            breakdown.push(BreakdownRow::Facility {
                name: fac.name.clone(),
                distance_m: fac.distance_m,
                specialty: fac.specialty,
                daily_outpatients: fac.daily_outpatients,
                rx_rate,
                daily_dispensed,
                share,
                share_reason,
                daily_flow,
            });
        }

        let (annual, confidence) = if facilities.is_empty() {
            trace.push(format!(
                "no medical facilities found; substituting the national per-pharmacy median ({})",
                NATIONAL_STATS.median_annual_rx
            ));
            (NATIONAL_STATS.median_annual_rx, Confidence::Low)
        } else {
            let annual = (total_daily * NATIONAL_STATS.working_days as f64) as u32;
            trace.push(format!(
                "total {:.1} rx/day x {} working days = {} rx/year",
                total_daily, NATIONAL_STATS.working_days, annual
            ));
            (annual, Confidence::Medium)
        };

        EstimationResult {
            method: MethodId::FacilityFlow,
            annual_rx: annual,
            low: (annual as f64 * self.params.range_low) as u32,
            high: (annual as f64 * self.params.range_high) as u32,
            confidence,
            daily_rx: total_daily as u32,
            breakdown,
            trace,
            references: references(),
        }
    }

    /// Capture share of one facility's dispensed prescriptions.
    fn capture_share(
        &self,
        fac: &MedicalFacility,
        pharmacy: Coordinates,
        competitors: &[CompetingPharmacy],
    ) -> (f64, String) {
        let p = &self.params;
        let dist = haversine_m(fac.coords, pharmacy);
        let comp_dist = |c: &CompetingPharmacy| haversine_m(fac.coords, c.coords);

        // Gate pharmacies: competitors sitting at the facility's doorstep.
        let gate_comps: Vec<&CompetingPharmacy> = competitors
            .iter()
            .filter(|c| comp_dist(c) <= p.gate_radius_m)
            .collect();

        let huff_weight = |d: f64| 1.0 / d.max(p.min_huff_distance_m);

        let (share, reason) = if !gate_comps.is_empty() {
            let gate_capture = (p.gate_capture_rate
                + p.gate_capture_step * (gate_comps.len() - 1) as f64)
                .min(p.gate_capture_cap);
            let residual = 1.0 - gate_capture;
            let non_gate: Vec<f64> = competitors
                .iter()
                .filter(|c| {
                    let d = comp_dist(c);
                    d > p.gate_radius_m && d <= p.huff_radius_m
                })
                .map(|c| huff_weight(comp_dist(c)))
                .collect();
            let tw = huff_weight(dist);
            let huff_ratio = if non_gate.is_empty() {
                1.0
            } else {
                tw / (tw + non_gate.iter().sum::<f64>())
            };
            let share = residual * huff_ratio;
            let reason = format!(
                "{} gate pharmacy(ies) capture {:.0}%; residual {:.0}% split among {} non-gate competitor(s)",
                gate_comps.len(),
                gate_capture * 100.0,
                residual * 100.0,
                non_gate.len(),
            );
            (share, reason)
        } else {
            let (base, tier_note) = self.tier_base(dist);
            let near: Vec<f64> = competitors
                .iter()
                .filter(|c| comp_dist(c) < p.huff_radius_m)
                .map(|c| huff_weight(comp_dist(c)))
                .collect();
            if near.is_empty() {
                (base, format!("{tier_note}, no nearby competitors"))
            } else {
                let tw = huff_weight(dist);
                let share = base * (tw / (tw + near.iter().sum::<f64>()));
                (
                    share,
                    format!("{tier_note}, split among {} competitor(s)", near.len()),
                )
            }
        };

        (share.min(p.share_cap), reason)
    }

    fn tier_base(&self, dist: f64) -> (f64, &'static str) {
        let p = &self.params;
        if dist <= p.tier_shares[0].0 {
            (p.tier_shares[0].1, "within 50m (de facto gate position)")
        } else if dist <= p.tier_shares[1].0 {
            (p.tier_shares[1].1, "within 150m (close siting)")
        } else if dist <= p.tier_shares[2].0 {
            (p.tier_shares[2].1, "within 300m (walking range)")
        } else {
            (p.far_share, "beyond 300m (cycling range)")
        }
    }
}

fn references() -> Vec<Reference> {
    vec![
        Reference::new(
            "MHLW treatment-behavior survey 2020",
            "per-specialty prescription issue rates",
            "https://www.mhlw.go.jp/toukei/list/35-34.html",
        ),
        Reference::new(
            "MHLW dispensing-cost trends FY2022",
            "national dispensing rate (79.0%)",
            "https://www.mhlw.go.jp/topics/medias/med/",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FacilityKind, Provenance};
    use crate::specialty::Specialty;

    const PH: Coordinates = Coordinates {
        lat: 35.6800,
        lon: 139.7600,
    };

    fn facility_at(distance_m: f64, daily_outpatients: u32, specialty: Specialty) -> MedicalFacility {
        MedicalFacility {
            name: "テストクリニック".to_string(),
            kind: FacilityKind::Clinic,
            coords: PH.offset_north_m(distance_m),
            distance_m,
            specialty,
            daily_outpatients,
            beds: 0,
            has_inhouse_dispensary: false,
            provenance: Provenance::Observed,
            registry_annual_outpatients: None,
        }
    }

    fn competitor_near(fac: &MedicalFacility, offset_m: f64) -> CompetingPharmacy {
        CompetingPharmacy {
            name: "競合薬局".to_string(),
            coords: fac.coords.offset_north_m(offset_m),
            distance_m: fac.distance_m + offset_m,
            confirmed_annual_rx: None,
            is_chain: false,
        }
    }

    #[test]
    fn test_single_facility_no_competitors() {
        // 100 outpatients at 40m, general internal (0.76), dispensing 0.79,
        // no in-house dispensary, zero competitors:
        // share 0.75 → daily flow ≈ 45.0 → annual ≈ 13,730
        let fac = facility_at(40.0, 100, Specialty::GeneralInternal);
        let r = FacilityFlowModel::default().predict(PH, &[fac], &[]);
        assert_eq!(r.confidence, Confidence::Medium);
        match &r.breakdown[0] {
            BreakdownRow::Facility { share, daily_flow, .. } => {
                assert!((share - 0.75).abs() < 1e-9);
                assert!((daily_flow - 45.03).abs() < 0.1, "daily flow {daily_flow}");
            }
            _ => panic!("expected facility row"),
        }
        assert!(
            r.annual_rx > 13_600 && r.annual_rx < 13_800,
            "annual {}",
            r.annual_rx
        );
        assert!(r.range_is_consistent());
    }

    #[test]
    fn test_empty_facilities_uses_national_median() {
        let r = FacilityFlowModel::default().predict(PH, &[], &[]);
        assert_eq!(r.annual_rx, 8_000);
        assert_eq!(r.confidence, Confidence::Low);
        assert!(r.range_is_consistent());
    }

    #[test]
    fn test_inhouse_dispensary_damping() {
        let mut fac = facility_at(40.0, 100, Specialty::GeneralInternal);
        fac.has_inhouse_dispensary = true;
        let r = FacilityFlowModel::default().predict(PH, &[fac], &[]);
        // 0.6 × the scenario above
        assert!(
            r.annual_rx > 8_100 && r.annual_rx < 8_300,
            "annual {}",
            r.annual_rx
        );
    }

    #[test]
    fn test_gate_pharmacy_residual_share() {
        let fac = facility_at(150.0, 100, Specialty::GeneralInternal);
        let gate = competitor_near(&fac, 30.0);
        let r = FacilityFlowModel::default().predict(PH, &[fac], &[gate]);
        match &r.breakdown[0] {
            BreakdownRow::Facility { share, share_reason, .. } => {
                // one gate captures 70%, no non-gate competitors → target
                // takes the full 30% residual
                assert!((share - 0.30).abs() < 1e-9, "share {share}");
                assert!(share_reason.contains("gate pharmacy"));
            }
            _ => panic!("expected facility row"),
        }
    }

    #[test]
    fn test_multiple_gates_raise_capture_to_cap() {
        let fac = facility_at(150.0, 100, Specialty::GeneralInternal);
        let gates: Vec<_> = (0..6).map(|i| competitor_near(&fac, 10.0 + i as f64)).collect();
        let r = FacilityFlowModel::default().predict(PH, &[fac], &gates);
        match &r.breakdown[0] {
            BreakdownRow::Facility { share, .. } => {
                // capture = min(0.70 + 0.05×5, 0.85) = 0.85 → residual 0.15
                assert!((share - 0.15).abs() < 1e-9, "share {share}");
            }
            _ => panic!("expected facility row"),
        }
    }

    #[test]
    fn test_residual_split_with_non_gate_competitor() {
        let fac = facility_at(150.0, 100, Specialty::GeneralInternal);
        let gate = competitor_near(&fac, 40.0);
        let rival = competitor_near(&fac, 200.0);
        let r = FacilityFlowModel::default().predict(PH, &[fac], &[gate, rival]);
        match &r.breakdown[0] {
            BreakdownRow::Facility { share, .. } => {
                // residual 0.30; weights 1/150 (target) vs 1/200 (rival)
                let expect = 0.30 * ((1.0 / 150.0) / (1.0 / 150.0 + 1.0 / 200.0));
                assert!((share - expect).abs() < 0.01, "share {share} expect {expect}");
            }
            _ => panic!("expected facility row"),
        }
    }

    #[test]
    fn test_share_capped_at_0_90() {
        // Facility essentially on top of the pharmacy, no competitors:
        // tier base 0.75 already under cap; force cap via distance ~0 and
        // check the cap holds for adversarial weights too.
        let fac = facility_at(1.0, 100, Specialty::GeneralInternal);
        let r = FacilityFlowModel::default().predict(PH, &[fac], &[]);
        match &r.breakdown[0] {
            BreakdownRow::Facility { share, .. } => assert!(*share <= 0.90),
            _ => panic!("expected facility row"),
        }
    }

    #[test]
    fn test_idempotent() {
        let fac = facility_at(120.0, 80, Specialty::Orthopedics);
        let comp = competitor_near(&fac, 90.0);
        let model = FacilityFlowModel::default();
        let a = model.predict(PH, std::slice::from_ref(&fac), std::slice::from_ref(&comp));
        let b = model.predict(PH, &[fac], &[comp]);
        assert_eq!(a.annual_rx, b.annual_rx);
        assert_eq!(a.daily_rx, b.daily_rx);
    }

    #[test]
    fn test_zero_outpatient_facility_skipped() {
        let fac = facility_at(100.0, 0, Specialty::GeneralInternal);
        let r = FacilityFlowModel::default().predict(PH, &[fac], &[]);
        assert!(r.breakdown.is_empty());
        assert_eq!(r.daily_rx, 0);
        // facilities were present, so the median fallback does not kick in
        assert_eq!(r.annual_rx, 0);
        assert_eq!(r.confidence, Confidence::Medium);
    }

    mod share_bounds {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Capture share stays in [0, 0.90] for arbitrary geometry.
            #[test]
            fn capture_share_bounded(
                fac_dist in 1.0f64..2_000.0,
                outpatients in 1u32..500,
                comp_offsets in proptest::collection::vec(1.0f64..1_500.0, 0..8),
            ) {
                let fac = facility_at(fac_dist, outpatients, Specialty::GeneralInternal);
                let comps: Vec<_> = comp_offsets
                    .iter()
                    .map(|o| competitor_near(&fac, *o))
                    .collect();
                let r = FacilityFlowModel::default().predict(PH, &[fac], &comps);
                for row in &r.breakdown {
                    if let BreakdownRow::Facility { share, .. } = row {
                        prop_assert!(*share >= 0.0 && *share <= 0.90, "share {}", share);
                    }
                }
            }
        }
    }
}
