//! End-to-end estimation pipeline.
//!
//! One `assess` call runs the full sequence: geocode the address, resolve
//! population density, detect the gate situation, fix the commercial
//! radius, search facilities and competitors, merge registry data, damp
//! congested facility defaults, run both models and blend. The same
//! pipeline, minus the blend and with the confirmed figure withheld,
//! serves the calibration engine through `blind_predict`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::blend::{blend, calibrated_blend_weight, smart_blend_weight, BlendDecision};
use crate::calibration::{CalibrationContext, SharedCalibration};
use crate::catchment::{commercial_radius, detect_gate, search_radius_m, GateOutcome, RadiusDecision};
use crate::catchment_model::CatchmentPopulationModel;
use crate::congestion::{apply_congestion, CongestionAdjustment};
use crate::density::{DensityBand, DensityLookup, DensityResolver};
use crate::error::Result;
use crate::flow_model::FacilityFlowModel;
use crate::geo::Coordinates;
use crate::models::{
    calc_deviation, calc_implied_missing_facility, CompetingPharmacy, Deviation, EstimationResult,
    ImpliedFacilityGap, MedicalFacility, PharmacyType,
};
use crate::params::{
    BlendParams, CatchmentModelParams, CongestionParams, FlowModelParams, NATIONAL_STATS,
};
use crate::services::{
    map_facility, map_pharmacy, AddressResolver, FacilitySearch, RegistryLookup, ResolvedAddress,
};

/// Facility scan radius used before the commercial radius is known,
/// meters. Gate detection only needs the immediate surroundings.
const PROBE_RADIUS_M: u32 = 500;

/// Input to one assessment run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EstimationRequest {
    /// Pharmacy name (planned or existing); drives gate detection.
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub pharmacy_type: PharmacyType,
    /// Facilities the caller knows about that no search will find, e.g.
    /// a clinic opening next door.
    #[serde(default)]
    pub manual_facilities: Vec<ManualFacility>,
    /// Known actual annual count, for deviation analysis only. Never
    /// fed into the models.
    #[serde(default)]
    pub known_annual_rx: Option<u32>,
}

/// A caller-supplied facility, positioned by distance only.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ManualFacility {
    pub name: String,
    pub specialty: crate::specialty::Specialty,
    pub daily_outpatients: u32,
    pub distance_m: f64,
    #[serde(default)]
    pub has_inhouse_dispensary: bool,
}

/// Everything one assessment produced, ready for rendering or export.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SiteAssessment {
    pub name: String,
    pub address: String,
    pub coords: Coordinates,
    pub pharmacy_type: PharmacyType,
    pub density: DensityLookup,
    pub gate: GateOutcome,
    pub radius: RadiusDecision,
    pub facilities: Vec<MedicalFacility>,
    pub competitors: Vec<CompetingPharmacy>,
    pub congestion: Option<CongestionAdjustment>,
    pub method1: EstimationResult,
    pub method2: EstimationResult,
    pub estimate: EstimationResult,
    /// Method 1 weight used in the blend.
    pub m1_weight: f64,
    pub calibrated: bool,
    /// Present when the caller supplied a known actual count.
    pub deviation: Option<Deviation>,
    pub implied_gap: Option<ImpliedFacilityGap>,
    pub generated_at: DateTime<Utc>,
}

/// What the calibration engine needs from a blind run.
#[derive(Debug, Clone)]
pub struct BlindPrediction {
    pub m1_rx: u32,
    pub m2_rx: u32,
    pub density: u32,
    pub n_facilities: usize,
    pub n_competitors: usize,
    pub is_gate: bool,
    pub log: Vec<String>,
}

/// Model parameter bundle; `Default` gives the documented values.
#[derive(Debug, Clone, Default)]
pub struct EstimatorConfig {
    pub flow: FlowModelParams,
    pub catchment: CatchmentModelParams,
    pub congestion: CongestionParams,
    pub blend: BlendParams,
}

/// The estimation pipeline over a set of collaborators.
pub struct Estimator<A, F, R> {
    resolver: A,
    search: F,
    registry: R,
    density: DensityResolver,
    calibration: SharedCalibration,
    config: EstimatorConfig,
}

impl<A, F, R> Estimator<A, F, R>
where
    A: AddressResolver,
    F: FacilitySearch,
    R: RegistryLookup,
{
    pub fn new(resolver: A, search: F, registry: R) -> Self {
        Self::with_config(resolver, search, registry, EstimatorConfig::default())
    }

    pub fn with_config(resolver: A, search: F, registry: R, config: EstimatorConfig) -> Self {
        Self {
            resolver,
            search,
            registry,
            density: DensityResolver,
            calibration: CalibrationContext::new(),
            config,
        }
    }

    /// Share a calibration context with other estimators or the
    /// calibration engine.
    pub fn set_calibration(&mut self, ctx: SharedCalibration) {
        self.calibration = ctx;
    }

    pub fn calibration(&self) -> &SharedCalibration {
        &self.calibration
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Geocode through the configured resolver.
    pub fn resolve_address(&self, address: &str) -> Result<ResolvedAddress> {
        self.resolver.resolve(address)
    }

    /// Run the full assessment for one site.
    pub fn assess(&self, request: &EstimationRequest) -> Result<SiteAssessment> {
        log::info!("assessing \"{}\" at {}", request.name, request.address);
        let resolved = self.resolver.resolve(&request.address)?;
        let coords = resolved.coords;
        // The resolver's formatted address carries the full prefecture
        // and ward spelling even when the input omits them.
        let density = self.density.resolve(&resolved.formatted);
        let band = DensityBand::from_density(density.density);

        let scene = self.build_scene(request, coords, &density)?;
        let SceneData {
            pharmacy_type,
            gate,
            radius,
            mut facilities,
            competitors,
        } = scene;

        let congestion = apply_congestion(&mut facilities, &self.config.congestion);

        let method1 = FacilityFlowModel::new(self.config.flow.clone()).predict(
            coords,
            &facilities,
            &competitors,
        );
        let method2 = CatchmentPopulationModel::new(self.config.catchment.clone()).predict(
            coords,
            pharmacy_type,
            density.density,
            radius.radius_m,
            &facilities,
            &competitors,
        );

        let stats = self.calibration.current();
        let decision: BlendDecision = match &stats {
            Some(s) => calibrated_blend_weight(s, band),
            None => {
                let confirmed = facilities.iter().filter(|f| f.is_confirmed()).count();
                smart_blend_weight(
                    &self.config.blend,
                    density.density,
                    facilities.len(),
                    confirmed,
                )
            }
        };
        let estimate = blend(&method1, &method2, &decision, stats.as_ref(), band);

        let deviation = request
            .known_annual_rx
            .and_then(|actual| calc_deviation(actual, estimate.annual_rx));
        let implied_gap = request
            .known_annual_rx
            .and_then(|actual| calc_implied_missing_facility(actual, estimate.annual_rx));

        Ok(SiteAssessment {
            name: request.name.clone(),
            address: request.address.clone(),
            coords,
            pharmacy_type,
            density,
            gate,
            radius,
            facilities,
            competitors,
            congestion,
            method1,
            method2,
            estimate,
            m1_weight: decision.m1_weight,
            calibrated: decision.calibrated,
            deviation,
            implied_gap,
            generated_at: Utc::now(),
        })
    }

    /// Both models' raw predictions for a site, calibration withheld.
    pub fn blind_predict(
        &self,
        name: &str,
        address: &str,
        pharmacy_type: PharmacyType,
    ) -> Result<BlindPrediction> {
        let resolved = self.resolver.resolve(address)?;
        let coords = resolved.coords;
        let density = self.density.resolve(&resolved.formatted);

        let request = EstimationRequest {
            name: name.to_string(),
            address: address.to_string(),
            pharmacy_type,
            manual_facilities: vec![],
            known_annual_rx: None,
        };
        let scene = self.build_scene(&request, coords, &density)?;
        let SceneData {
            pharmacy_type,
            gate,
            radius,
            mut facilities,
            competitors,
        } = scene;

        apply_congestion(&mut facilities, &self.config.congestion);
        let m1 = FacilityFlowModel::new(self.config.flow.clone()).predict(
            coords,
            &facilities,
            &competitors,
        );
        let m2 = CatchmentPopulationModel::new(self.config.catchment.clone()).predict(
            coords,
            pharmacy_type,
            density.density,
            radius.radius_m,
            &facilities,
            &competitors,
        );

        let mut log = vec![
            format!("density: {} ({})", density.density, density.source),
            format!("gate: {}", gate.reason),
            format!("radius: {}", radius.rationale),
        ];
        log.extend(m1.trace.iter().cloned());
        log.extend(m2.trace.iter().cloned());

        Ok(BlindPrediction {
            m1_rx: m1.annual_rx,
            m2_rx: m2.annual_rx,
            density: density.density,
            n_facilities: facilities.len(),
            n_competitors: competitors.len(),
            is_gate: gate.is_gate,
            log,
        })
    }

    /// Gather the spatial scene: gate outcome, effective pharmacy type,
    /// commercial radius, facilities (searched + registry + manual) and
    /// competitors.
    fn build_scene(
        &self,
        request: &EstimationRequest,
        coords: Coordinates,
        density: &DensityLookup,
    ) -> Result<SceneData> {
        // Gate detection needs facilities before the radius is known, so
        // the immediate surroundings are probed first.
        let probe = self
            .search
            .medical_facilities(coords, PROBE_RADIUS_M)?
            .iter()
            .map(|r| map_facility(r, coords))
            .collect::<Vec<_>>();
        let gate = detect_gate(&request.name, &probe);

        let pharmacy_type = match request.pharmacy_type {
            PharmacyType::Standalone if gate.is_gate => PharmacyType::ClinicAttached,
            other => other,
        };
        let radius = commercial_radius(density.density, pharmacy_type, &gate.reason);
        let search_radius = search_radius_m(radius.radius_m);

        let mut facilities: Vec<MedicalFacility> = self
            .search
            .medical_facilities(coords, search_radius)?
            .iter()
            .map(|r| map_facility(r, coords))
            .collect();
        let records = self.registry.facilities_near(coords, search_radius)?;
        crate::services::merge_registry(
            &mut facilities,
            &records,
            coords,
            NATIONAL_STATS.working_days,
        );
        for m in &request.manual_facilities {
            facilities.push(MedicalFacility::manual(
                coords,
                m.name.clone(),
                m.specialty,
                m.daily_outpatients,
                m.distance_m,
                m.has_inhouse_dispensary,
            ));
        }
        facilities.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));

        let competitors: Vec<CompetingPharmacy> = self
            .search
            .pharmacies(coords, search_radius)?
            .iter()
            .filter(|p| p.name != request.name)
            .map(|p| map_pharmacy(p, coords))
            .collect();

        log::debug!(
            "scene: {} facilities, {} competitors, radius {}m",
            facilities.len(),
            competitors.len(),
            radius.radius_m
        );
        Ok(SceneData {
            pharmacy_type,
            gate,
            radius,
            facilities,
            competitors,
        })
    }
}

struct SceneData {
    pharmacy_type: PharmacyType,
    gate: GateOutcome,
    radius: RadiusDecision,
    facilities: Vec<MedicalFacility>,
    competitors: Vec<CompetingPharmacy>,
}
