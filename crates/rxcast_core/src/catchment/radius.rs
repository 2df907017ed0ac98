//! Commercial (catchment) radius policy.
//!
//! The radius depends on the pharmacy-type variant:
//! - clinic-attached: fixed 300 m, overriding everything; the business
//!   depends on the adjacent facility's visit flow, not a residential
//!   catchment;
//! - supermarket-embedded: the host store's primary trade area (the disc
//!   holding 70-80 % of its shoppers), from a 5-tier density-band table;
//!   sparser areas need a wider catch to reach equivalent population;
//! - standalone: a 6-tier walking/cycling radius table, shrinking as
//!   density rises.
//!
//! The density band used by the supermarket table is the same
//! `DensityBand` value used by the age-distribution lookup in the
//! catchment-population model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::density::DensityBand;
use crate::models::PharmacyType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RadiusDecision {
    pub radius_m: u32,
    pub rationale: String,
}

const CLINIC_ATTACHED_RADIUS_M: u32 = 300;

/// Primary trade-area radius of the host store by density band.
fn supermarket_radius_m(band: DensityBand) -> u32 {
    match band {
        DensityBand::UltraHigh => 800,
        DensityBand::High => 1_000,
        DensityBand::Mid => 1_200,
        DensityBand::Low => 1_800,
        DensityBand::UltraLow => 3_000,
    }
}

/// Walking/cycling catchment tiers for standalone pharmacies:
/// (minimum density, radius, note).
static STANDALONE_TIERS: &[(u32, u32, &str)] = &[
    (12_000, 300, "ultra-dense area (>=12,000/km2), 5-minute walk"),
    (6_000, 400, "dense area (6,000-12,000/km2), 7-minute walk"),
    (3_000, 500, "mid-high density (3,000-6,000/km2), 8-minute walk"),
    (1_500, 700, "mid density (1,500-3,000/km2), 12-minute walk"),
    (500, 1_000, "low density (500-1,500/km2), walking/cycling range"),
];
const STANDALONE_FALLBACK: (u32, &str) = (2_000, "very low density (<500/km2), wide-area catchment");

/// Resolve the commercial radius for a pharmacy.
pub fn commercial_radius(
    density: u32,
    pharmacy_type: PharmacyType,
    gate_reason: &str,
) -> RadiusDecision {
    match pharmacy_type {
        PharmacyType::ClinicAttached => {
            let why = if gate_reason.is_empty() {
                "adjacent to a medical facility"
            } else {
                gate_reason
            };
            RadiusDecision {
                radius_m: CLINIC_ATTACHED_RADIUS_M,
                rationale: format!("clinic-attached ({why}): facility-dependent, fixed 300m"),
            }
        }
        PharmacyType::SupermarketEmbedded => {
            let band = DensityBand::from_density(density);
            let r = supermarket_radius_m(band);
            RadiusDecision {
                radius_m: r,
                rationale: format!(
                    "supermarket-embedded, density band {} ({density}/km2): host-store primary trade area {r}m",
                    band.label_long()
                ),
            }
        }
        PharmacyType::Standalone => {
            for (min_density, r, note) in STANDALONE_TIERS {
                if density >= *min_density {
                    return RadiusDecision {
                        radius_m: *r,
                        rationale: format!("{note} (density {density}/km2)"),
                    };
                }
            }
            let (r, note) = STANDALONE_FALLBACK;
            RadiusDecision {
                radius_m: r,
                rationale: format!("{note} (density {density}/km2)"),
            }
        }
    }
}

/// Radius handed to the facility-search collaborator: wider than the
/// commercial radius so competitors just outside it still register.
pub fn search_radius_m(commercial_radius_m: u32) -> u32 {
    ((commercial_radius_m as f64 * 1.5) as u32).max(600)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clinic_attached_fixed_for_all_densities() {
        for density in [0, 499, 1_500, 3_000, 8_000, 25_000] {
            let d = commercial_radius(density, PharmacyType::ClinicAttached, "adjacent");
            assert_eq!(d.radius_m, 300, "density {density}");
        }
    }

    #[test]
    fn test_standalone_monotone_non_increasing() {
        let densities = [100u32, 500, 1_500, 3_000, 6_000, 12_000, 30_000];
        let mut prev = u32::MAX;
        for d in densities {
            let r = commercial_radius(d, PharmacyType::Standalone, "").radius_m;
            assert!(r <= prev, "radius grew at density {d}");
            prev = r;
        }
    }

    #[test]
    fn test_standalone_tier_values() {
        let cases = [
            (30_000, 300),
            (12_000, 300),
            (6_500, 400),
            (3_000, 500),
            (2_000, 700),
            (800, 1_000),
            (200, 2_000),
        ];
        for (density, expected) in cases {
            assert_eq!(
                commercial_radius(density, PharmacyType::Standalone, "").radius_m,
                expected,
                "density {density}"
            );
        }
    }

    #[test]
    fn test_mid_density_standalone_is_500() {
        // density 3,000, standalone, not a gate → 500 m
        let d = commercial_radius(3_000, PharmacyType::Standalone, "");
        assert_eq!(d.radius_m, 500);
    }

    #[test]
    fn test_supermarket_wider_in_sparse_areas() {
        let dense = commercial_radius(15_000, PharmacyType::SupermarketEmbedded, "").radius_m;
        let sparse = commercial_radius(300, PharmacyType::SupermarketEmbedded, "").radius_m;
        assert_eq!(dense, 800);
        assert_eq!(sparse, 3_000);
        assert!(sparse > dense);
    }

    #[test]
    fn test_supermarket_band_matches_age_distribution_band() {
        // Regression guard for the historical label-mismatch defect: the
        // band driving the supermarket radius must be the same band value
        // that keys the age-distribution table for any density.
        use crate::params::CatchmentModelParams;
        let params = CatchmentModelParams::default();
        for density in [0u32, 499, 500, 1_999, 2_000, 4_999, 5_000, 9_999, 10_000, 40_000] {
            let band = DensityBand::from_density(density);
            let radius_from_band = supermarket_radius_m(band);
            let via_policy =
                commercial_radius(density, PharmacyType::SupermarketEmbedded, "").radius_m;
            assert_eq!(radius_from_band, via_policy, "density {density}");
            // Same band value must produce a defined age distribution.
            let dist = params.age_distribution(band);
            let total: f64 = dist.iter().map(|(_, s)| s).sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_search_radius_floor() {
        assert_eq!(search_radius_m(300), 600);
        assert_eq!(search_radius_m(500), 750);
        assert_eq!(search_radius_m(1_200), 1_800);
    }
}
