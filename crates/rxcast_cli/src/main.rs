//! rxcast CLI
//!
//! Runs the estimation pipeline against an offline scene file: single-site
//! assessment, municipality calibration batches, and JSON Schema dumps of
//! the wire types.

mod export;
mod scene;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use rxcast_core::calibration::{calc_stats, LocalCalibrationEngine, RegionalCalibrationEngine};
use rxcast_core::models::PharmacyType;
use rxcast_core::params::CalibrationParams;
use rxcast_core::{EstimationRequest, Estimator, SiteAssessment};

use scene::Scene;

#[derive(Parser)]
#[command(name = "rxcast")]
#[command(about = "Pharmacy annual prescription-volume estimation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess one pharmacy site
    Estimate {
        /// Scene JSON file with geocodes, facilities and pharmacies
        #[arg(long)]
        scene: PathBuf,

        /// Pharmacy name (drives gate detection)
        #[arg(long)]
        name: String,

        /// Site address
        #[arg(long)]
        address: String,

        /// Pharmacy siting type
        #[arg(long, value_parser = parse_pharmacy_type, default_value = "standalone")]
        pharmacy_type: PharmacyType,

        /// Known actual annual count, for deviation analysis
        #[arg(long)]
        actual: Option<u32>,

        /// Write the breakdown as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Print the full assessment as JSON instead of a summary
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Calibrate against the scene's reference pharmacies, then assess
    Calibrate {
        #[arg(long)]
        scene: PathBuf,

        /// Seed address; calibration is scoped to its municipality
        #[arg(long)]
        address: String,

        /// Widen the batch to a region keyword instead of the seed
        /// municipality, pulling candidates from the registry
        #[arg(long)]
        region: Option<String>,

        /// Assess this pharmacy after calibrating
        #[arg(long)]
        name: Option<String>,

        /// Inter-sample throttle in milliseconds (0 for offline scenes)
        #[arg(long, default_value = "0")]
        throttle_ms: u64,

        /// Write the collected samples as CSV
        #[arg(long)]
        samples_csv: Option<PathBuf>,
    },

    /// Print the JSON Schema of a wire type
    Schema {
        /// One of: request, assessment
        #[arg(long, default_value = "assessment")]
        r#type: String,
    },
}

fn parse_pharmacy_type(s: &str) -> std::result::Result<PharmacyType, String> {
    match s {
        "standalone" => Ok(PharmacyType::Standalone),
        "supermarket" => Ok(PharmacyType::SupermarketEmbedded),
        "clinic-attached" => Ok(PharmacyType::ClinicAttached),
        other => Err(format!(
            "unknown pharmacy type \"{other}\" (standalone, supermarket, clinic-attached)"
        )),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Estimate {
            scene,
            name,
            address,
            pharmacy_type,
            actual,
            csv,
            json,
        } => {
            let scene = Scene::load(&scene)?;
            let estimator = Estimator::new(scene.resolver(), scene.search(), scene.registry());
            let request = EstimationRequest {
                name,
                address,
                pharmacy_type,
                manual_facilities: vec![],
                known_annual_rx: actual,
            };
            let assessment = estimator.assess(&request).context("assessment failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&assessment)?);
            } else {
                print_summary(&assessment);
            }
            if let Some(path) = csv {
                export::write_breakdown_csv(&assessment, &path)?;
                println!("breakdown written to {}", path.display());
            }
        }

        Commands::Calibrate {
            scene,
            address,
            region,
            name,
            throttle_ms,
            samples_csv,
        } => {
            let scene = Scene::load(&scene)?;
            let estimator = Arc::new(Estimator::new(
                scene.resolver(),
                scene.search(),
                scene.registry(),
            ));
            let params = CalibrationParams {
                throttle_ms,
                ..CalibrationParams::default()
            };
            let cancel = AtomicBool::new(false);
            let mut report = |pct: u8, msg: &str| println!("[{pct:>3}%] {msg}");
            let samples = match region {
                Some(region) => {
                    RegionalCalibrationEngine::new(estimator.clone(), region, params.clone())
                        .collect_samples(&cancel, &mut report)?
                }
                None => LocalCalibrationEngine::new(
                    estimator.clone(),
                    scene.references.clone(),
                    &address,
                    params.clone(),
                )
                .collect_samples(&cancel, &mut report)?,
            };
            if let Some(path) = samples_csv {
                export::write_samples_csv(&samples, &path)?;
                println!("samples written to {}", path.display());
            }

            match calc_stats(&samples, &params) {
                Some(stats) => {
                    println!(
                        "calibrated: n={} MAPE m1={:.1}% m2={:.1}% blend={:.1}% at w={:.1}",
                        stats.n,
                        stats.mape_m1 * 100.0,
                        stats.mape_m2 * 100.0,
                        stats.mape_optimal * 100.0,
                        stats.optimal_m1_weight
                    );
                    estimator.calibration().install(stats);
                }
                None => println!("too few valid samples; calibration not installed"),
            }

            if let Some(name) = name {
                let request = EstimationRequest {
                    name,
                    address,
                    pharmacy_type: PharmacyType::Standalone,
                    manual_facilities: vec![],
                    known_annual_rx: None,
                };
                let assessment = estimator.assess(&request)?;
                print_summary(&assessment);
            }
        }

        Commands::Schema { r#type } => {
            let schema = match r#type.as_str() {
                "request" => schemars::schema_for!(EstimationRequest),
                "assessment" => schemars::schema_for!(SiteAssessment),
                other => anyhow::bail!("unknown schema type \"{other}\""),
            };
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }

    Ok(())
}

fn print_summary(a: &SiteAssessment) {
    println!("== {} ==", a.name);
    println!("address:    {}", a.address);
    println!("density:    {}/km2 ({})", a.density.density, a.density.source);
    println!("type:       {}", a.pharmacy_type.label());
    println!("gate:       {}", a.gate.reason);
    println!("radius:     {}m ({})", a.radius.radius_m, a.radius.rationale);
    println!(
        "scene:      {} facilities, {} competitors",
        a.facilities.len(),
        a.competitors.len()
    );
    if let Some(c) = &a.congestion {
        println!(
            "congestion: {} unconfirmed facilities damped x{:.3}",
            c.unconfirmed_count, c.factor
        );
    }
    println!(
        "method 1:   {} rx/year ({}..{})",
        a.method1.annual_rx, a.method1.low, a.method1.high
    );
    println!(
        "method 2:   {} rx/year ({}..{})",
        a.method2.annual_rx, a.method2.low, a.method2.high
    );
    let blend_kind = if a.calibrated { "calibrated" } else { "heuristic" };
    println!(
        "estimate:   {} rx/year ({}..{}), w1={:.2} ({blend_kind}), confidence {:?}",
        a.estimate.annual_rx, a.estimate.low, a.estimate.high, a.m1_weight, a.estimate.confidence
    );
    if let Some(d) = &a.deviation {
        println!("deviation:  {:+.1}% ({:?})", d.percent, d.severity);
    }
    if let Some(g) = &a.implied_gap {
        println!(
            "gap:        unexplained {} rx/year, roughly a {}-outpatient/day clinic",
            g.gap_annual, g.implied_daily_outpatients
        );
    }
}
