use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;
use crate::specialty::Specialty;

/// Facility classification for the flow model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum FacilityKind {
    Hospital,
    Clinic,
}

/// Where a facility record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Provenance {
    /// Found by the map/facility search collaborator.
    Observed,
    /// Added from the public registry to fill search gaps.
    RegistrySupplemented,
    /// Entered by hand (e.g. a planned clinic not yet on any map).
    Manual,
}

/// Pharmacy siting variant; drives the catchment-radius policy and the
/// supermarket adjustments in the catchment-population model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default,
)]
pub enum PharmacyType {
    /// A free-standing dispensing pharmacy.
    #[default]
    Standalone,
    /// Inside a supermarket or drugstore; draws on the store's trade
    /// area rather than its own walking catchment.
    SupermarketEmbedded,
    /// Adjacent and effectively dedicated to one medical facility.
    ClinicAttached,
}

impl PharmacyType {
    pub fn label(&self) -> &'static str {
        match self {
            PharmacyType::Standalone => "standalone",
            PharmacyType::SupermarketEmbedded => "supermarket-embedded",
            PharmacyType::ClinicAttached => "clinic-attached",
        }
    }
}

/// A nearby medical facility feeding prescriptions into the area.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MedicalFacility {
    pub name: String,
    pub kind: FacilityKind,
    pub coords: Coordinates,
    /// Distance from the target pharmacy, meters. Never negative.
    pub distance_m: f64,
    pub specialty: Specialty,
    /// Estimated or confirmed daily outpatient count. Never negative.
    pub daily_outpatients: u32,
    pub beds: u32,
    /// Facility dispenses in-house; most of its prescriptions never reach
    /// an outside pharmacy.
    pub has_inhouse_dispensary: bool,
    pub provenance: Provenance,
    /// Annual outpatient total confirmed by the public registry, when
    /// available. Presence of this value marks the facility "confirmed"
    /// for the congestion adjuster.
    pub registry_annual_outpatients: Option<u32>,
}

impl MedicalFacility {
    /// Whether the daily outpatient figure is backed by registry data
    /// rather than a table default.
    pub fn is_confirmed(&self) -> bool {
        self.registry_annual_outpatients.is_some()
    }

    /// Build a manually entered clinic at a given distance from the
    /// pharmacy. The position is approximated as due north; share math
    /// only consumes the distance, so the bearing does not matter.
    pub fn manual(
        pharmacy: Coordinates,
        name: impl Into<String>,
        specialty: Specialty,
        daily_outpatients: u32,
        distance_m: f64,
        has_inhouse_dispensary: bool,
    ) -> Self {
        Self {
            name: name.into(),
            kind: FacilityKind::Clinic,
            coords: pharmacy.offset_north_m(distance_m),
            distance_m,
            specialty,
            daily_outpatients,
            beds: 0,
            has_inhouse_dispensary,
            provenance: Provenance::Manual,
            registry_annual_outpatients: None,
        }
    }
}

/// A rival pharmacy competing for the same prescriptions.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompetingPharmacy {
    pub name: String,
    pub coords: Coordinates,
    /// Distance from the target pharmacy, meters.
    pub distance_m: f64,
    /// Annual prescription count confirmed by the public registry. Used
    /// for display and calibration samples, never in prediction math.
    pub confirmed_annual_rx: Option<u32>,
    /// Belongs to a national drugstore/dispensing chain.
    pub is_chain: bool,
}

/// National pharmacy/drugstore chains, matched by substring.
static MAJOR_CHAINS: &[&str] = &[
    "ウエルシア",
    "ツルハ",
    "マツモトキヨシ",
    "マツキヨ",
    "スギ薬局",
    "コスモス薬品",
    "クリエイト",
    "サンドラッグ",
    "カワチ薬品",
    "日本調剤",
    "クオール",
    "アイン",
    "ファーマライズ",
    "総合メディカル",
];

/// Whether a pharmacy name matches a known national chain.
pub fn is_major_chain(name: &str) -> bool {
    MAJOR_CHAINS.iter().any(|c| name.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_detection() {
        assert!(is_major_chain("ウエルシア薬局 国立店"));
        assert!(is_major_chain("スギ薬局 府中店"));
        assert!(!is_major_chain("ひまわり調剤薬局"));
    }

    #[test]
    fn test_manual_facility_distance_consistent() {
        let ph = Coordinates::new(35.68, 139.76);
        let f = MedicalFacility::manual(ph, "新設クリニック", Specialty::GeneralInternal, 50, 120.0, false);
        assert_eq!(f.provenance, Provenance::Manual);
        assert!(!f.is_confirmed());
        let actual = ph.distance_m(f.coords);
        assert!((actual - f.distance_m).abs() < 5.0);
    }
}
