use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::age::AgeBand;
use crate::specialty::Specialty;

/// Which model produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MethodId {
    /// Method 1: nearby-facility flow model.
    FacilityFlow,
    /// Method 2: catchment-population model.
    CatchmentPopulation,
    /// Heuristic or calibrated blend of the two.
    Blend,
}

impl MethodId {
    pub fn label(&self) -> &'static str {
        match self {
            MethodId::FacilityFlow => "method 1: nearby-facility flow",
            MethodId::CatchmentPopulation => "method 2: catchment population",
            MethodId::Blend => "blended estimate",
        }
    }
}

/// Confidence tier of an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// One line of an estimate's computation breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BreakdownRow {
    /// Method 1: one medical facility's contribution.
    Facility {
        name: String,
        distance_m: f64,
        specialty: Specialty,
        daily_outpatients: u32,
        rx_rate: f64,
        /// Prescriptions/day leaving the facility for outside pharmacies.
        daily_dispensed: f64,
        /// The target pharmacy's capture share of those.
        share: f64,
        share_reason: String,
        /// Prescriptions/day captured by the target pharmacy.
        daily_flow: f64,
    },
    /// Method 2: one age band's contribution to the catchment pool.
    AgeBand {
        band: AgeBand,
        population: u32,
        annual_visit_rate: f64,
        annual_visits: u64,
        annual_rx: u64,
    },
}

/// A cited data source backing parts of the estimate.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Reference {
    pub name: String,
    pub detail: String,
    pub url: String,
}

impl Reference {
    pub fn new(name: &str, detail: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            detail: detail.to_string(),
            url: url.to_string(),
        }
    }
}

/// The output of one estimation model run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EstimationResult {
    pub method: MethodId,
    /// Point estimate, prescriptions per year.
    pub annual_rx: u32,
    /// Lower bound of the plausible range. `low <= annual_rx <= high`.
    pub low: u32,
    /// Upper bound of the plausible range.
    pub high: u32,
    pub confidence: Confidence,
    /// Point estimate, prescriptions per working day.
    pub daily_rx: u32,
    pub breakdown: Vec<BreakdownRow>,
    /// Narrative trace of how the figure was computed.
    pub trace: Vec<String>,
    pub references: Vec<Reference>,
}

impl EstimationResult {
    /// Invariant check: the range brackets the point estimate.
    pub fn range_is_consistent(&self) -> bool {
        self.low <= self.annual_rx && self.annual_rx <= self.high
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_consistency_helper() {
        let r = EstimationResult {
            method: MethodId::FacilityFlow,
            annual_rx: 10_000,
            low: 6_000,
            high: 18_000,
            confidence: Confidence::Medium,
            daily_rx: 32,
            breakdown: vec![],
            trace: vec![],
            references: vec![],
        };
        assert!(r.range_is_consistent());
    }

    #[test]
    fn test_serializes_to_json() {
        let r = EstimationResult {
            method: MethodId::CatchmentPopulation,
            annual_rx: 9_500,
            low: 5_225,
            high: 17_100,
            confidence: Confidence::Low,
            daily_rx: 31,
            breakdown: vec![BreakdownRow::AgeBand {
                band: AgeBand::LateSenior,
                population: 800,
                annual_visit_rate: 22.1,
                annual_visits: 17_680,
                annual_rx: 9_640,
            }],
            trace: vec!["catchment population: 5,800".to_string()],
            references: vec![],
        };
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("catchment_population"));
        assert!(json.contains("age_band"));
    }
}
