use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Population density band: 5 contiguous, non-overlapping, exhaustive
/// ranges over persons/km².
///
/// Every band-keyed table in the crate (supermarket radius tiers, age
/// distributions, calibration multipliers) is keyed by this enum. An
/// earlier string-keyed design carried two label formats, a long form
/// with embedded thresholds and a short form, and lookups with the wrong
/// form silently fell back to defaults. Keying by the enum removes that
/// bug class; `label()` and `label_long()` exist purely for presentation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum DensityBand {
    /// < 500 /km²
    UltraLow,
    /// 500 – 2,000 /km²
    Low,
    /// 2,000 – 5,000 /km²
    Mid,
    /// 5,000 – 10,000 /km²
    High,
    /// ≥ 10,000 /km²
    UltraHigh,
}

impl DensityBand {
    pub const ALL: [DensityBand; 5] = [
        DensityBand::UltraLow,
        DensityBand::Low,
        DensityBand::Mid,
        DensityBand::High,
        DensityBand::UltraHigh,
    ];

    pub fn from_density(density: u32) -> Self {
        if density >= 10_000 {
            DensityBand::UltraHigh
        } else if density >= 5_000 {
            DensityBand::High
        } else if density >= 2_000 {
            DensityBand::Mid
        } else if density >= 500 {
            DensityBand::Low
        } else {
            DensityBand::UltraLow
        }
    }

    /// Short display label.
    pub fn label(&self) -> &'static str {
        match self {
            DensityBand::UltraHigh => "ultra-high",
            DensityBand::High => "high",
            DensityBand::Mid => "mid",
            DensityBand::Low => "low",
            DensityBand::UltraLow => "ultra-low",
        }
    }

    /// Long display label with the numeric thresholds spelled out.
    pub fn label_long(&self) -> &'static str {
        match self {
            DensityBand::UltraHigh => "ultra-high (>=10k/km2)",
            DensityBand::High => "high (5k-10k/km2)",
            DensityBand::Mid => "mid (2k-5k/km2)",
            DensityBand::Low => "low (500-2k/km2)",
            DensityBand::UltraLow => "ultra-low (<500/km2)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(DensityBand::from_density(0), DensityBand::UltraLow);
        assert_eq!(DensityBand::from_density(499), DensityBand::UltraLow);
        assert_eq!(DensityBand::from_density(500), DensityBand::Low);
        assert_eq!(DensityBand::from_density(1_999), DensityBand::Low);
        assert_eq!(DensityBand::from_density(2_000), DensityBand::Mid);
        assert_eq!(DensityBand::from_density(4_999), DensityBand::Mid);
        assert_eq!(DensityBand::from_density(5_000), DensityBand::High);
        assert_eq!(DensityBand::from_density(9_999), DensityBand::High);
        assert_eq!(DensityBand::from_density(10_000), DensityBand::UltraHigh);
        assert_eq!(DensityBand::from_density(50_000), DensityBand::UltraHigh);
    }

    #[test]
    fn test_bands_are_exhaustive_and_contiguous() {
        // Walking density upward never skips a band and never goes back.
        let mut prev = DensityBand::from_density(0);
        for d in 1..20_000u32 {
            let b = DensityBand::from_density(d);
            assert!(b >= prev, "band regressed at density {d}");
            prev = b;
        }
    }

    #[test]
    fn test_labels_distinct() {
        let shorts: Vec<_> = DensityBand::ALL.iter().map(|b| b.label()).collect();
        let longs: Vec<_> = DensityBand::ALL.iter().map(|b| b.label_long()).collect();
        for i in 0..shorts.len() {
            for j in (i + 1)..shorts.len() {
                assert_ne!(shorts[i], shorts[j]);
                assert_ne!(longs[i], longs[j]);
            }
        }
    }
}
