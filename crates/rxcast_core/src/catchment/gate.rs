//! Gate-pharmacy detection.
//!
//! A "gate" pharmacy is effectively dedicated to one adjacent medical
//! facility and captures most of its prescriptions. Detection is rule
//! based, in priority order:
//! 1. the pharmacy name carries an explicit front-of-clinic marker;
//! 2. any facility lies within 80 m;
//! 3. the pharmacy name contains the first ≥4 characters of one of the
//!    5 nearest facility names.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::MedicalFacility;

/// Proximity threshold for rule 2, meters.
const ADJACENCY_THRESHOLD_M: f64 = 80.0;
/// Facility-name prefix length for rule 3, characters.
const NAME_PREFIX_CHARS: usize = 4;
/// How many nearest facilities rule 3 inspects.
const NAME_MATCH_CANDIDATES: usize = 5;

/// Explicit front-of-clinic markers in pharmacy names.
static GATE_NAME_MARKERS: &[&str] = &["門前", "病院前", "医院前", "クリニック前", "院前"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GateOutcome {
    pub is_gate: bool,
    pub reason: String,
}

/// Decide whether the pharmacy is a gate pharmacy.
pub fn detect_gate(pharmacy_name: &str, facilities: &[MedicalFacility]) -> GateOutcome {
    for marker in GATE_NAME_MARKERS {
        if pharmacy_name.contains(marker) {
            return GateOutcome {
                is_gate: true,
                reason: format!("pharmacy name contains \"{marker}\""),
            };
        }
    }
    if !facilities.is_empty() {
        let mut by_distance: Vec<&MedicalFacility> = facilities.iter().collect();
        by_distance.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        for fac in &by_distance {
            if fac.distance_m <= ADJACENCY_THRESHOLD_M {
                return GateOutcome {
                    is_gate: true,
                    reason: format!("adjacent to \"{}\" ({:.0}m)", fac.name, fac.distance_m),
                };
            }
        }
        for fac in by_distance.iter().take(NAME_MATCH_CANDIDATES) {
            let prefix: String = fac.name.chars().take(NAME_PREFIX_CHARS).collect();
            if prefix.chars().count() >= NAME_PREFIX_CHARS && pharmacy_name.contains(&prefix) {
                return GateOutcome {
                    is_gate: true,
                    reason: format!("facility name \"{}\" echoed in pharmacy name", fac.name),
                };
            }
        }
    }
    GateOutcome {
        is_gate: false,
        reason: "standalone catchment".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinates;
    use crate::models::{FacilityKind, Provenance};
    use crate::specialty::Specialty;

    fn facility(name: &str, distance_m: f64) -> MedicalFacility {
        MedicalFacility {
            name: name.to_string(),
            kind: FacilityKind::Clinic,
            coords: Coordinates::new(35.0, 139.0),
            distance_m,
            specialty: Specialty::GeneralInternal,
            daily_outpatients: 30,
            beds: 0,
            has_inhouse_dispensary: false,
            provenance: Provenance::Observed,
            registry_annual_outpatients: None,
        }
    }

    #[test]
    fn test_name_marker_wins() {
        let out = detect_gate("さくら門前薬局", &[]);
        assert!(out.is_gate);
        assert!(out.reason.contains("門前"));
    }

    #[test]
    fn test_proximity_rule() {
        let facs = vec![facility("青葉クリニック", 250.0), facility("中央内科医院", 60.0)];
        let out = detect_gate("ひなた薬局", &facs);
        assert!(out.is_gate);
        assert!(out.reason.contains("中央内科医院"));
    }

    #[test]
    fn test_boundary_at_threshold_is_gate() {
        let facs = vec![facility("中央内科医院", 80.0)];
        assert!(detect_gate("ひなた薬局", &facs).is_gate);
        let facs = vec![facility("中央内科医院", 80.1)];
        assert!(!detect_gate("ひなた薬局", &facs).is_gate);
    }

    #[test]
    fn test_shared_prefix_rule() {
        let facs = vec![facility("やまびこ整形外科", 200.0)];
        let out = detect_gate("やまびこ薬局", &facs);
        assert!(out.is_gate);
        assert!(out.reason.contains("やまびこ整形外科"));
    }

    #[test]
    fn test_prefix_rule_limited_to_five_nearest() {
        let mut facs: Vec<MedicalFacility> = (0..5)
            .map(|i| facility(&format!("クリニック{i}号館"), 150.0 + i as f64))
            .collect();
        facs.push(facility("やまびこ整形外科", 290.0));
        let out = detect_gate("やまびこ薬局", &facs);
        assert!(!out.is_gate, "sixth-nearest facility must not trigger the prefix rule");
    }

    #[test]
    fn test_default_is_standalone() {
        let out = detect_gate("ひなた薬局", &[facility("青葉クリニック", 250.0)]);
        assert!(!out.is_gate);
        assert_eq!(out.reason, "standalone catchment");
    }
}
