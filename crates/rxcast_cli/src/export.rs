//! CSV export of an assessment's facility breakdown.

use std::path::Path;

use anyhow::{Context, Result};
use rxcast_core::calibration::CalibrationSample;
use rxcast_core::models::BreakdownRow;
use rxcast_core::SiteAssessment;

/// Write the estimate plus the per-facility and per-age-band breakdown
/// as CSV, one row per breakdown line.
pub fn write_breakdown_csv(assessment: &SiteAssessment, path: &Path) -> Result<()> {
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    w.write_record([
        "kind",
        "name",
        "distance_m",
        "specialty",
        "daily_outpatients",
        "share",
        "daily_flow",
        "age_band",
        "population",
        "annual_rx",
    ])?;
    for row in &assessment.estimate.breakdown {
        match row {
            BreakdownRow::Facility {
                name,
                distance_m,
                specialty,
                daily_outpatients,
                share,
                daily_flow,
                ..
            } => {
                w.write_record([
                    "facility".to_string(),
                    name.clone(),
                    format!("{distance_m:.0}"),
                    specialty.label().to_string(),
                    daily_outpatients.to_string(),
                    format!("{share:.3}"),
                    format!("{daily_flow:.1}"),
                    String::new(),
                    String::new(),
                    String::new(),
                ])?;
            }
            BreakdownRow::AgeBand {
                band,
                population,
                annual_rx,
                ..
            } => {
                w.write_record([
                    "age_band".to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    band.label().to_string(),
                    population.to_string(),
                    annual_rx.to_string(),
                ])?;
            }
        }
    }
    w.write_record([
        "estimate".to_string(),
        assessment.name.clone(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        assessment.estimate.annual_rx.to_string(),
    ])?;
    w.flush()?;
    Ok(())
}

/// Write calibration samples as CSV, one row per reference pharmacy.
pub fn write_samples_csv(samples: &[CalibrationSample], path: &Path) -> Result<()> {
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    w.write_record([
        "name",
        "address",
        "actual_rx",
        "m1_rx",
        "m2_rx",
        "density",
        "band",
        "n_facilities",
        "n_competitors",
        "is_gate",
    ])?;
    for s in samples {
        w.write_record([
            s.name.clone(),
            s.address.clone(),
            s.actual_rx.to_string(),
            s.m1_rx.to_string(),
            s.m2_rx.to_string(),
            s.density.to_string(),
            s.band().label().to_string(),
            s.n_facilities.to_string(),
            s.n_competitors.to_string(),
            s.is_gate.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
