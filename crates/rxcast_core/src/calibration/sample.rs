use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::density::DensityBand;

/// One reference pharmacy: a confirmed annual count paired with both
/// models' blind predictions at its location.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CalibrationSample {
    pub name: String,
    pub address: String,
    /// Registry-confirmed annual prescription count.
    pub actual_rx: u32,
    /// Method 1 blind prediction.
    pub m1_rx: u32,
    /// Method 2 blind prediction.
    pub m2_rx: u32,
    /// Population density at the sample location, persons/km².
    pub density: u32,
    pub n_facilities: usize,
    pub n_competitors: usize,
    pub is_gate: bool,
    /// Per-sample narrative from the blind run.
    pub log: Vec<String>,
}

impl CalibrationSample {
    pub fn band(&self) -> DensityBand {
        DensityBand::from_density(self.density)
    }

    /// Whether the sample can enter error statistics.
    pub fn is_valid(&self) -> bool {
        self.actual_rx > 0 && (self.m1_rx > 0 || self.m2_rx > 0)
    }

    /// Absolute percentage error of a blended prediction with Method 1
    /// weight `w`.
    pub fn blend_ape(&self, w: f64) -> f64 {
        let pred = self.m1_rx as f64 * w + self.m2_rx as f64 * (1.0 - w);
        (pred - self.actual_rx as f64).abs() / self.actual_rx as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(actual: u32, m1: u32, m2: u32) -> CalibrationSample {
        CalibrationSample {
            name: "サンプル薬局".to_string(),
            address: "東京都台東区1-1".to_string(),
            actual_rx: actual,
            m1_rx: m1,
            m2_rx: m2,
            density: 12_000,
            n_facilities: 3,
            n_competitors: 2,
            is_gate: false,
            log: vec![],
        }
    }

    #[test]
    fn test_band_from_density() {
        assert_eq!(sample(10_000, 9_000, 11_000).band(), DensityBand::UltraHigh);
    }

    #[test]
    fn test_blend_ape_endpoints() {
        let s = sample(10_000, 12_000, 8_000);
        assert!((s.blend_ape(1.0) - 0.2).abs() < 1e-9);
        assert!((s.blend_ape(0.0) - 0.2).abs() < 1e-9);
        assert!(s.blend_ape(0.5) < 1e-9);
    }

    #[test]
    fn test_validity() {
        assert!(sample(10_000, 12_000, 8_000).is_valid());
        assert!(!sample(0, 12_000, 8_000).is_valid());
        assert!(!sample(10_000, 0, 0).is_valid());
    }
}
