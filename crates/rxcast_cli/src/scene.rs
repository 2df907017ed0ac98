//! Scene files: offline collaborator data for the estimator.
//!
//! A scene file bundles everything the pipeline would otherwise fetch
//! from live services: a geocoding table, surveyed facilities and
//! pharmacies, and registry records. Estimates from the same scene file
//! are fully reproducible.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use rxcast_core::calibration::ReferencePharmacy;
use rxcast_core::geo::Coordinates;
use rxcast_core::services::{
    RawFacilityRecord, RawPharmacyRecord, RegistryRecord, StaticAddressResolver,
    StaticFacilitySearch, StaticRegistry,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeEntry {
    pub address: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub geocodes: Vec<GeocodeEntry>,
    #[serde(default)]
    pub facilities: Vec<RawFacilityRecord>,
    #[serde(default)]
    pub pharmacies: Vec<RawPharmacyRecord>,
    #[serde(default)]
    pub registry: Vec<RegistryRecord>,
    /// Pharmacies with confirmed annual counts, for calibration runs.
    #[serde(default)]
    pub references: Vec<ReferencePharmacy>,
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scene file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse scene file {}", path.display()))
    }

    pub fn resolver(&self) -> StaticAddressResolver {
        StaticAddressResolver::new(
            self.geocodes
                .iter()
                .map(|g| (g.address.clone(), Coordinates::new(g.lat, g.lon)))
                .collect(),
        )
    }

    pub fn search(&self) -> StaticFacilitySearch {
        StaticFacilitySearch {
            facilities: self.facilities.clone(),
            pharmacies: self.pharmacies.clone(),
        }
    }

    pub fn registry(&self) -> StaticRegistry {
        StaticRegistry {
            records: self.registry.clone(),
            references: self.references.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_minimal_scene() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{
                "geocodes": [{{"address": "東京都台東区上野2-3", "lat": 35.71, "lon": 139.78}}],
                "facilities": [{{
                    "name": "上野内科クリニック",
                    "coords": {{"lat": 35.711, "lon": 139.78}},
                    "doctors": 2
                }}]
            }}"#
        )
        .unwrap();
        let scene = Scene::load(f.path()).unwrap();
        assert_eq!(scene.geocodes.len(), 1);
        assert_eq!(scene.facilities.len(), 1);
        assert!(scene.pharmacies.is_empty());
        assert!(!scene.facilities[0].is_hospital);
    }

    #[test]
    fn test_missing_file_errors_with_path() {
        let err = Scene::load(Path::new("/no/such/scene.json")).unwrap_err();
        assert!(err.to_string().contains("scene.json"));
    }
}
