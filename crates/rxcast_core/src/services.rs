//! Collaborator seams: geocoding, facility search and the public
//! facility registry.
//!
//! The core never talks to the network itself. Callers hand in
//! implementations of these traits; the bundled `Static*` variants are
//! deterministic in-memory implementations for tests, offline runs and
//! the calibration harness.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::geo::{haversine_m, Coordinates};
use crate::models::{
    is_major_chain, CompetingPharmacy, FacilityKind, MedicalFacility, Provenance,
};
use crate::specialty::{estimate_daily_outpatients, Specialty};

/// Geocoding result.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAddress {
    pub coords: Coordinates,
    /// The formatted address the resolver matched, used by the density
    /// cascade and municipality extraction.
    pub formatted: String,
}

/// Free-text address → coordinates.
pub trait AddressResolver {
    fn resolve(&self, address: &str) -> Result<ResolvedAddress>;
}

/// A facility record as the search collaborator returns it, before
/// domain mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFacilityRecord {
    pub name: String,
    pub coords: Coordinates,
    /// Collaborator-side amenity/specialty tag, when present.
    #[serde(default)]
    pub specialty_tag: Option<String>,
    #[serde(default)]
    pub is_hospital: bool,
    #[serde(default)]
    pub beds: Option<u32>,
    #[serde(default)]
    pub doctors: Option<u32>,
    #[serde(default)]
    pub has_inhouse_dispensary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPharmacyRecord {
    pub name: String,
    pub coords: Coordinates,
}

/// Spatial search for medical facilities and pharmacies around a point.
pub trait FacilitySearch {
    fn medical_facilities(
        &self,
        center: Coordinates,
        radius_m: u32,
    ) -> Result<Vec<RawFacilityRecord>>;

    fn pharmacies(&self, center: Coordinates, radius_m: u32) -> Result<Vec<RawPharmacyRecord>>;
}

/// One public-registry entry for a medical facility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub name: String,
    pub coords: Coordinates,
    /// Reported annual outpatient count, when the facility filed one.
    #[serde(default)]
    pub annual_outpatients: Option<u32>,
}

/// A pharmacy with a registry-confirmed annual count, usable as
/// calibration ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencePharmacy {
    pub name: String,
    pub address: String,
    pub annual_rx: u32,
}

/// Public medical-facility registry lookup.
pub trait RegistryLookup {
    fn facilities_near(&self, center: Coordinates, radius_m: u32) -> Result<Vec<RegistryRecord>>;

    /// Pharmacies with confirmed annual counts whose address contains
    /// the region keyword. These seed calibration batches.
    fn reference_pharmacies(&self, region: &str) -> Result<Vec<ReferencePharmacy>>;
}

/// Map a raw search record into the domain model.
pub fn map_facility(raw: &RawFacilityRecord, pharmacy: Coordinates) -> MedicalFacility {
    let specialty = raw
        .specialty_tag
        .as_deref()
        .and_then(Specialty::from_tag)
        .unwrap_or_else(|| Specialty::from_name(&raw.name));
    let kind = if raw.is_hospital || raw.beds.unwrap_or(0) >= 20 {
        FacilityKind::Hospital
    } else {
        FacilityKind::Clinic
    };
    let beds = raw.beds.unwrap_or(0);
    MedicalFacility {
        name: raw.name.clone(),
        kind,
        coords: raw.coords,
        distance_m: haversine_m(pharmacy, raw.coords),
        specialty,
        daily_outpatients: estimate_daily_outpatients(
            kind,
            beds,
            raw.doctors.unwrap_or(1),
            specialty,
        ),
        beds,
        has_inhouse_dispensary: raw.has_inhouse_dispensary,
        provenance: Provenance::Observed,
        registry_annual_outpatients: None,
    }
}

pub fn map_pharmacy(raw: &RawPharmacyRecord, pharmacy: Coordinates) -> CompetingPharmacy {
    CompetingPharmacy {
        name: raw.name.clone(),
        coords: raw.coords,
        distance_m: haversine_m(pharmacy, raw.coords),
        confirmed_annual_rx: None,
        is_chain: is_major_chain(&raw.name),
    }
}

/// Registry records are matched to observed facilities by proximity and
/// name overlap; unmatched records become supplemented facilities.
const REGISTRY_MATCH_RADIUS_M: f64 = 60.0;

/// Merge registry records into observed facilities.
///
/// A record matching an observed facility attaches its outpatient count
/// (and replaces the default daily estimate when present). Unmatched
/// records are appended as `RegistrySupplemented` facilities with a
/// name-derived specialty.
pub fn merge_registry(
    facilities: &mut Vec<MedicalFacility>,
    records: &[RegistryRecord],
    pharmacy: Coordinates,
    working_days: u32,
) {
    for rec in records {
        let matched = facilities.iter_mut().find(|f| {
            haversine_m(f.coords, rec.coords) <= REGISTRY_MATCH_RADIUS_M
                && names_overlap(&f.name, &rec.name)
        });
        match matched {
            Some(fac) => {
                fac.registry_annual_outpatients = rec.annual_outpatients;
                if let Some(annual) = rec.annual_outpatients {
                    fac.daily_outpatients = (annual / working_days).max(1);
                }
            }
            None => {
                let specialty = Specialty::from_name(&rec.name);
                let daily = match rec.annual_outpatients {
                    Some(annual) => (annual / working_days).max(1),
                    None => estimate_daily_outpatients(FacilityKind::Clinic, 0, 1, specialty),
                };
                facilities.push(MedicalFacility {
                    name: rec.name.clone(),
                    kind: FacilityKind::Clinic,
                    coords: rec.coords,
                    distance_m: haversine_m(pharmacy, rec.coords),
                    specialty,
                    daily_outpatients: daily,
                    beds: 0,
                    has_inhouse_dispensary: false,
                    provenance: Provenance::RegistrySupplemented,
                    registry_annual_outpatients: rec.annual_outpatients,
                });
            }
        }
    }
}

fn names_overlap(a: &str, b: &str) -> bool {
    let prefix: String = a.chars().take(3).collect();
    prefix.chars().count() >= 3 && b.contains(&prefix) || {
        let prefix: String = b.chars().take(3).collect();
        prefix.chars().count() >= 3 && a.contains(&prefix)
    }
}

/// In-memory address resolver backed by a fixed table.
#[derive(Debug, Default)]
pub struct StaticAddressResolver {
    entries: Vec<(String, Coordinates)>,
}

impl StaticAddressResolver {
    pub fn new(entries: Vec<(String, Coordinates)>) -> Self {
        Self { entries }
    }
}

impl AddressResolver for StaticAddressResolver {
    fn resolve(&self, address: &str) -> Result<ResolvedAddress> {
        self.entries
            .iter()
            .find(|(key, _)| address.contains(key.as_str()) || key.contains(address))
            .map(|(key, coords)| ResolvedAddress {
                coords: *coords,
                formatted: key.clone(),
            })
            .ok_or_else(|| CoreError::ResolutionFailed(format!("address not in table: {address}")))
    }
}

/// In-memory facility search over fixed record sets.
#[derive(Debug, Default)]
pub struct StaticFacilitySearch {
    pub facilities: Vec<RawFacilityRecord>,
    pub pharmacies: Vec<RawPharmacyRecord>,
}

impl FacilitySearch for StaticFacilitySearch {
    fn medical_facilities(
        &self,
        center: Coordinates,
        radius_m: u32,
    ) -> Result<Vec<RawFacilityRecord>> {
        Ok(self
            .facilities
            .iter()
            .filter(|f| haversine_m(center, f.coords) <= radius_m as f64)
            .cloned()
            .collect())
    }

    fn pharmacies(&self, center: Coordinates, radius_m: u32) -> Result<Vec<RawPharmacyRecord>> {
        Ok(self
            .pharmacies
            .iter()
            .filter(|p| haversine_m(center, p.coords) <= radius_m as f64)
            .cloned()
            .collect())
    }
}

/// In-memory registry over fixed record sets.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    pub records: Vec<RegistryRecord>,
    pub references: Vec<ReferencePharmacy>,
}

impl RegistryLookup for StaticRegistry {
    fn facilities_near(&self, center: Coordinates, radius_m: u32) -> Result<Vec<RegistryRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| haversine_m(center, r.coords) <= radius_m as f64)
            .cloned()
            .collect())
    }

    fn reference_pharmacies(&self, region: &str) -> Result<Vec<ReferencePharmacy>> {
        Ok(self
            .references
            .iter()
            .filter(|r| r.address.contains(region))
            .cloned()
            .collect())
    }
}
