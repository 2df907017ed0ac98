//! Facility congestion adjuster.
//!
//! Clustered clinics share a finite local patient pool: where many
//! facilities sit close together, the per-facility average runs below the
//! national figure the defaults assume. When 6 or more facilities carry
//! unconfirmed (table-default) outpatient counts, those counts are damped
//! by a smooth exponential factor. Registry-confirmed counts and manually
//! entered facilities are left untouched.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::{MedicalFacility, Provenance};
use crate::params::CongestionParams;

/// What the adjuster did, for the narrative trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CongestionAdjustment {
    pub unconfirmed_count: usize,
    pub factor: f64,
}

fn is_exempt(f: &MedicalFacility) -> bool {
    f.is_confirmed() || f.provenance == Provenance::Manual
}

/// Damp unconfirmed facilities' daily outpatient estimates in place.
/// Returns `None` when no adjustment applies.
pub fn apply_congestion(
    facilities: &mut [MedicalFacility],
    params: &CongestionParams,
) -> Option<CongestionAdjustment> {
    let n = facilities.iter().filter(|f| !is_exempt(f)).count();
    if n < params.threshold {
        return None;
    }
    let factor = (-params.decay_rate * (n as f64 - (params.threshold as f64 - 1.0)))
        .exp()
        .max(params.factor_floor);
    for f in facilities.iter_mut().filter(|f| !is_exempt(f)) {
        let damped = (f.daily_outpatients as f64 * factor) as u32;
        f.daily_outpatients = damped.max(params.min_daily_outpatients);
    }
    log::info!(
        "congestion adjustment: {n} unconfirmed facilities, outpatient defaults scaled by {factor:.3}"
    );
    Some(CongestionAdjustment {
        unconfirmed_count: n,
        factor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinates;
    use crate::models::FacilityKind;
    use crate::specialty::Specialty;

    fn facility(outpatients: u32, provenance: Provenance, confirmed: Option<u32>) -> MedicalFacility {
        MedicalFacility {
            name: "クリニック".to_string(),
            kind: FacilityKind::Clinic,
            coords: Coordinates::new(35.0, 139.0),
            distance_m: 100.0,
            specialty: Specialty::GeneralInternal,
            daily_outpatients: outpatients,
            beds: 0,
            has_inhouse_dispensary: false,
            provenance,
            registry_annual_outpatients: confirmed,
        }
    }

    #[test]
    fn test_below_threshold_no_adjustment() {
        let mut facs: Vec<_> = (0..5).map(|_| facility(30, Provenance::Observed, None)).collect();
        assert!(apply_congestion(&mut facs, &CongestionParams::default()).is_none());
        assert!(facs.iter().all(|f| f.daily_outpatients == 30));
    }

    #[test]
    fn test_eight_unconfirmed_scale_by_0_900() {
        // n=8 → factor = exp(−0.035 × 3) ≈ 0.9003
        let mut facs: Vec<_> = (0..8).map(|_| facility(100, Provenance::Observed, None)).collect();
        let adj = apply_congestion(&mut facs, &CongestionParams::default()).unwrap();
        assert_eq!(adj.unconfirmed_count, 8);
        assert!((adj.factor - 0.9003).abs() < 0.001);
        assert!(facs.iter().all(|f| f.daily_outpatients == 90));
    }

    #[test]
    fn test_factor_floor() {
        // n=30 → exp(−0.035 × 25) ≈ 0.417, floored at 0.50
        let mut facs: Vec<_> = (0..30).map(|_| facility(40, Provenance::Observed, None)).collect();
        let adj = apply_congestion(&mut facs, &CongestionParams::default()).unwrap();
        assert!((adj.factor - 0.50).abs() < 1e-9);
        assert!(facs.iter().all(|f| f.daily_outpatients == 20));
    }

    #[test]
    fn test_daily_floor() {
        let mut facs: Vec<_> = (0..10).map(|_| facility(5, Provenance::Observed, None)).collect();
        apply_congestion(&mut facs, &CongestionParams::default()).unwrap();
        assert!(facs.iter().all(|f| f.daily_outpatients == 5));
    }

    #[test]
    fn test_confirmed_and_manual_exempt() {
        let mut facs: Vec<_> = (0..7).map(|_| facility(100, Provenance::Observed, None)).collect();
        facs.push(facility(100, Provenance::Observed, Some(30_000)));
        facs.push(facility(100, Provenance::Manual, None));
        // registry-supplemented without a confirmed count is still damped
        facs.push(facility(100, Provenance::RegistrySupplemented, None));
        let adj = apply_congestion(&mut facs, &CongestionParams::default()).unwrap();
        assert_eq!(adj.unconfirmed_count, 8);
        assert_eq!(facs[7].daily_outpatients, 100, "confirmed facility untouched");
        assert_eq!(facs[8].daily_outpatients, 100, "manual facility untouched");
        assert!(facs[9].daily_outpatients < 100, "registry-supplemented default damped");
    }
}
