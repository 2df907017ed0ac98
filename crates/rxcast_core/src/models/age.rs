use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Five-bucket age partition used by the catchment-population model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum AgeBand {
    /// 0–14
    Child,
    /// 15–44
    YoungAdult,
    /// 45–64
    MiddleAge,
    /// 65–74
    EarlySenior,
    /// 75+
    LateSenior,
}

impl AgeBand {
    pub const ALL: [AgeBand; 5] = [
        AgeBand::Child,
        AgeBand::YoungAdult,
        AgeBand::MiddleAge,
        AgeBand::EarlySenior,
        AgeBand::LateSenior,
    ];

    /// Annual outpatient visits per person (patient survey 2020,
    /// consultation rate × 365). The weighted national average is about
    /// 12.4 visits/person/year, consistent with OECD figures for Japan.
    pub fn annual_visit_rate(&self) -> f64 {
        match self {
            AgeBand::Child => 9.8,
            AgeBand::YoungAdult => 7.2,
            AgeBand::MiddleAge => 11.3,
            AgeBand::EarlySenior => 19.2,
            AgeBand::LateSenior => 22.1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBand::Child => "0-14",
            AgeBand::YoungAdult => "15-44",
            AgeBand::MiddleAge => "45-64",
            AgeBand::EarlySenior => "65-74",
            AgeBand::LateSenior => "75+",
        }
    }
}
