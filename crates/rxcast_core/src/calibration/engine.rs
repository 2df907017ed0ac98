//! Calibration batch runners.
//!
//! The local engine filters a caller-supplied reference set of pharmacies
//! with confirmed annual counts down to the target municipality; the
//! regional engine asks the registry seam for candidates matching a
//! region keyword. Both blind-predict each target sequentially through
//! the estimation pipeline and derive statistics from the collected
//! samples. Sequential on purpose: the collaborators behind the pipeline
//! are rate limited, and the batch throttles itself between samples.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use super::sample::CalibrationSample;
use super::stats::{calc_stats, CalibrationStatistics};
use crate::error::{CoreError, Result};
use crate::models::PharmacyType;
use crate::params::CalibrationParams;
use crate::pipeline::Estimator;
use crate::services::{AddressResolver, FacilitySearch, RegistryLookup};

pub use crate::services::ReferencePharmacy;

/// Progress callback: completion percent and a status message.
pub type CalibrationProgress<'a> = &'a mut dyn FnMut(u8, &str);

/// A source of calibration batches.
pub trait CalibrationEngine {
    /// Run a batch. Returns `None` when too few samples were usable.
    fn calibrate(
        &self,
        cancel: &AtomicBool,
        progress: CalibrationProgress,
    ) -> Result<Option<CalibrationStatistics>>;
}

/// Batch engine scoped to the municipality of a seed address.
///
/// Only reference pharmacies in the same municipality are used: model
/// bias is strongly local (density structure, facility mix), and a batch
/// mixing municipalities learns a correction that fits none of them.
pub struct LocalCalibrationEngine<A, F, R> {
    estimator: Arc<Estimator<A, F, R>>,
    references: Vec<ReferencePharmacy>,
    seed_address: String,
    /// Siting type of the pharmacy being calibrated for; blind runs on
    /// the reference pharmacies use the same variant.
    target_type: PharmacyType,
    params: CalibrationParams,
}

impl<A, F, R> LocalCalibrationEngine<A, F, R>
where
    A: AddressResolver,
    F: FacilitySearch,
    R: RegistryLookup,
{
    pub fn new(
        estimator: Arc<Estimator<A, F, R>>,
        references: Vec<ReferencePharmacy>,
        seed_address: impl Into<String>,
        params: CalibrationParams,
    ) -> Self {
        Self {
            estimator,
            references,
            seed_address: seed_address.into(),
            target_type: PharmacyType::Standalone,
            params,
        }
    }

    pub fn for_pharmacy_type(mut self, target_type: PharmacyType) -> Self {
        self.target_type = target_type;
        self
    }

    /// Run the batch and return the raw samples.
    pub fn collect_samples(
        &self,
        cancel: &AtomicBool,
        progress: CalibrationProgress,
    ) -> Result<Vec<CalibrationSample>> {
        // The geocoder's formatted address carries the full municipality
        // spelling; raw input may abbreviate it.
        let seed = match self.estimator.resolve_address(&self.seed_address) {
            Ok(resolved) => resolved.formatted,
            Err(e) => {
                log::warn!("seed address not geocoded ({e}); using the raw text");
                self.seed_address.clone()
            }
        };
        let municipality = extract_municipality(&seed);
        let targets: Vec<ReferencePharmacy> = self
            .references
            .iter()
            .filter(|r| r.annual_rx >= self.params.min_annual_rx)
            .filter(|r| r.address.contains(&municipality))
            .take(self.params.max_samples)
            .cloned()
            .collect();
        log::info!(
            "calibration batch: {} reference pharmacies in \"{municipality}\"",
            targets.len()
        );
        progress(0, &format!("{} reference pharmacies found", targets.len()));
        run_batch(
            &self.estimator,
            &targets,
            self.target_type,
            &self.params,
            cancel,
            progress,
        )
    }
}

/// Batch engine over the registry's reference set for a whole region.
///
/// Wider scope than the municipality engine: the registry seam supplies
/// the candidates, so the caller only names the region keyword. Used to
/// seed statistics where the local reference set is too thin.
pub struct RegionalCalibrationEngine<A, F, R> {
    estimator: Arc<Estimator<A, F, R>>,
    region: String,
    target_type: PharmacyType,
    params: CalibrationParams,
}

impl<A, F, R> RegionalCalibrationEngine<A, F, R>
where
    A: AddressResolver,
    F: FacilitySearch,
    R: RegistryLookup,
{
    pub fn new(
        estimator: Arc<Estimator<A, F, R>>,
        region: impl Into<String>,
        params: CalibrationParams,
    ) -> Self {
        Self {
            estimator,
            region: region.into(),
            target_type: PharmacyType::Standalone,
            params,
        }
    }

    pub fn for_pharmacy_type(mut self, target_type: PharmacyType) -> Self {
        self.target_type = target_type;
        self
    }

    /// Query the registry for candidates and run the batch.
    pub fn collect_samples(
        &self,
        cancel: &AtomicBool,
        progress: CalibrationProgress,
    ) -> Result<Vec<CalibrationSample>> {
        let targets: Vec<ReferencePharmacy> = self
            .estimator
            .registry()
            .reference_pharmacies(&self.region)?
            .into_iter()
            .filter(|r| r.annual_rx >= self.params.min_annual_rx)
            .take(self.params.max_samples)
            .collect();
        log::info!(
            "calibration batch: {} registry candidates in \"{}\"",
            targets.len(),
            self.region
        );
        progress(0, &format!("{} registry candidates found", targets.len()));
        run_batch(
            &self.estimator,
            &targets,
            self.target_type,
            &self.params,
            cancel,
            progress,
        )
    }
}

impl<A, F, R> CalibrationEngine for RegionalCalibrationEngine<A, F, R>
where
    A: AddressResolver,
    F: FacilitySearch,
    R: RegistryLookup,
{
    fn calibrate(
        &self,
        cancel: &AtomicBool,
        progress: CalibrationProgress,
    ) -> Result<Option<CalibrationStatistics>> {
        let samples = self.collect_samples(cancel, progress)?;
        Ok(calc_stats(&samples, &self.params))
    }
}

/// Blind-predict each target sequentially, throttling between calls.
///
/// Cancellation keeps the partial batch when it already clears the
/// statistics floor; a batch cut shorter than that is an error carrying
/// the completed count.
fn run_batch<A, F, R>(
    estimator: &Estimator<A, F, R>,
    targets: &[ReferencePharmacy],
    target_type: PharmacyType,
    params: &CalibrationParams,
    cancel: &AtomicBool,
    progress: CalibrationProgress,
) -> Result<Vec<CalibrationSample>>
where
    A: AddressResolver,
    F: FacilitySearch,
    R: RegistryLookup,
{
    let mut samples = Vec::with_capacity(targets.len());
    for (i, target) in targets.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            if samples.len() >= params.min_valid_samples {
                log::warn!(
                    "calibration cancelled after {} samples; keeping the partial batch",
                    samples.len()
                );
                progress(100, &format!("cancelled, {} samples kept", samples.len()));
                return Ok(samples);
            }
            log::warn!("calibration cancelled after {} samples", samples.len());
            return Err(CoreError::Cancelled {
                completed: samples.len(),
            });
        }
        if i > 0 {
            std::thread::sleep(Duration::from_millis(params.throttle_ms));
        }
        let pct = (i * 100 / targets.len().max(1)) as u8;
        progress(pct, &format!("predicting {}", target.name));

        // one bad sample must not sink the batch
        match estimator.blind_predict(&target.name, &target.address, target_type) {
            Ok(pred) => samples.push(CalibrationSample {
                name: target.name.clone(),
                address: target.address.clone(),
                actual_rx: target.annual_rx,
                m1_rx: pred.m1_rx,
                m2_rx: pred.m2_rx,
                density: pred.density,
                n_facilities: pred.n_facilities,
                n_competitors: pred.n_competitors,
                is_gate: pred.is_gate,
                log: pred.log,
            }),
            Err(e) => {
                log::warn!("calibration sample \"{}\" skipped: {e}", target.name);
            }
        }
    }
    progress(100, &format!("{} samples collected", samples.len()));
    Ok(samples)
}

impl<A, F, R> CalibrationEngine for LocalCalibrationEngine<A, F, R>
where
    A: AddressResolver,
    F: FacilitySearch,
    R: RegistryLookup,
{
    fn calibrate(
        &self,
        cancel: &AtomicBool,
        progress: CalibrationProgress,
    ) -> Result<Option<CalibrationStatistics>> {
        let samples = self.collect_samples(cancel, progress)?;
        Ok(calc_stats(&samples, &self.params))
    }
}

static WARD_IN_CITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"市([^\d\s・]{1,6}?区)").expect("ward-in-city regex"));
static WARD_IN_TOKYO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"都([^\d\s・]{1,6}?区)").expect("ward-in-tokyo regex"));
static MUNICIPALITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[都道府県]([^\d\s・]{2,8}?[市区町村])").expect("municipality regex"));

/// Extract the municipality from a Japanese address.
///
/// Designated-city wards come back as the ward (the city would be too
/// wide a calibration scope); Tokyo special wards likewise. Otherwise the
/// first municipality suffix after the prefecture wins. Unparseable
/// addresses fall back to their first 10 characters.
pub fn extract_municipality(address: &str) -> String {
    if let Some(c) = WARD_IN_CITY.captures(address) {
        return c[1].to_string();
    }
    if let Some(c) = WARD_IN_TOKYO.captures(address) {
        return c[1].to_string();
    }
    if let Some(c) = MUNICIPALITY.captures(address) {
        return c[1].to_string();
    }
    address.chars().take(10).collect()
}
