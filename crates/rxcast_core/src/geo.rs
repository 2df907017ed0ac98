//! Geographic primitives: WGS84 coordinates and great-circle distance.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A WGS84 latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to another point in meters (haversine).
    pub fn distance_m(&self, other: Coordinates) -> f64 {
        haversine_m(*self, other)
    }

    /// A point `distance_m` meters due north of this one. Used when a
    /// facility is entered manually with a known distance but no
    /// surveyed position (1 degree of latitude ≈ 111 km).
    pub fn offset_north_m(&self, distance_m: f64) -> Coordinates {
        Coordinates {
            lat: self.lat + distance_m / 111_000.0,
            lon: self.lon,
        }
    }
}

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine great-circle distance in meters.
pub fn haversine_m(a: Coordinates, b: Coordinates) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    EARTH_RADIUS_M * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        let p = Coordinates::new(35.6762, 139.6503);
        assert!(haversine_m(p, p) < 1e-6);
    }

    #[test]
    fn test_known_distance_tokyo_osaka() {
        // Tokyo Station to Osaka Station: roughly 400 km
        let tokyo = Coordinates::new(35.6812, 139.7671);
        let osaka = Coordinates::new(34.7025, 135.4959);
        let d = haversine_m(tokyo, osaka);
        assert!(d > 390_000.0 && d < 410_000.0, "got {d}");
    }

    #[test]
    fn test_distance_symmetric() {
        let a = Coordinates::new(35.0, 139.0);
        let b = Coordinates::new(35.01, 139.01);
        assert!((haversine_m(a, b) - haversine_m(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_offset_north_roundtrip() {
        let p = Coordinates::new(35.6762, 139.6503);
        let q = p.offset_north_m(500.0);
        let d = haversine_m(p, q);
        assert!((d - 500.0).abs() < 5.0, "got {d}");
    }
}
