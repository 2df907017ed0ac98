//! Medical specialty categories and their statistical baselines.
//!
//! Two tables drive Method 1's inputs:
//! - per-specialty prescription rate (probability that an outpatient visit
//!   yields a prescription), from the national treatment-behavior survey;
//! - per-specialty default daily outpatient counts for non-bedded clinics
//!   ({base, per-doctor increment, cap}), from the 2020 national facility
//!   survey.
//!
//! Raw search records arrive with either a machine tag (e.g. "cardiology")
//! or only a Japanese facility name; both are mapped here. Mapping raw
//! records to a specialty and a default outpatient estimate is core
//! responsibility; the search collaborator only hands over raw records.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::FacilityKind;

/// Specialty category of a medical facility.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
pub enum Specialty {
    GeneralInternal,
    Cardiology,
    Gastroenterology,
    Diabetes,
    Neurology,
    Respiratory,
    Surgery,
    Orthopedics,
    Dermatology,
    Ophthalmology,
    Otolaryngology,
    Psychiatry,
    Pediatrics,
    ObGyn,
    Urology,
    Rehabilitation,
    Dental,
    #[default]
    Unknown,
}

/// Default daily outpatient parameters for a non-bedded clinic.
#[derive(Debug, Clone, Copy)]
pub struct OutpatientDefaults {
    /// Daily outpatients with a single (or unknown number of) doctor(s).
    pub base: u32,
    /// Increment per additional doctor beyond the first.
    pub per_doctor: u32,
    /// Upper bound regardless of staffing.
    pub cap: u32,
}

impl Specialty {
    /// Probability that an outpatient visit in this specialty yields a
    /// prescription. Chronic-disease specialties (cardiology, diabetes,
    /// psychiatry) run high; procedure-centric ones (ophthalmology,
    /// rehabilitation) run low. Dental prescriptions rarely reach an
    /// outside pharmacy at all.
    pub fn rx_rate(&self) -> f64 {
        match self {
            Specialty::GeneralInternal => 0.76,
            Specialty::Cardiology => 0.88,
            Specialty::Gastroenterology => 0.74,
            Specialty::Diabetes => 0.90,
            Specialty::Neurology => 0.82,
            Specialty::Respiratory => 0.78,
            Specialty::Surgery => 0.58,
            Specialty::Orthopedics => 0.72,
            Specialty::Dermatology => 0.64,
            Specialty::Ophthalmology => 0.52,
            Specialty::Otolaryngology => 0.58,
            Specialty::Psychiatry => 0.85,
            Specialty::Pediatrics => 0.62,
            Specialty::ObGyn => 0.44,
            Specialty::Urology => 0.70,
            Specialty::Rehabilitation => 0.40,
            Specialty::Dental => 0.08,
            Specialty::Unknown => 0.68,
        }
    }

    /// Default daily outpatient parameters (non-bedded clinics, national
    /// facility survey 2020). Orthopedics and ophthalmology see markedly
    /// more patients per day than the all-specialty average.
    pub fn outpatient_defaults(&self) -> OutpatientDefaults {
        let (base, per_doctor, cap) = match self {
            Specialty::GeneralInternal => (34, 10, 80),
            Specialty::Cardiology => (36, 9, 90),
            Specialty::Gastroenterology => (32, 8, 80),
            Specialty::Diabetes => (26, 8, 70),
            Specialty::Neurology => (28, 8, 70),
            Specialty::Respiratory => (30, 8, 75),
            Specialty::Surgery => (18, 6, 55),
            Specialty::Orthopedics => (48, 12, 120),
            Specialty::Dermatology => (41, 8, 100),
            Specialty::Ophthalmology => (54, 8, 130),
            Specialty::Otolaryngology => (50, 8, 120),
            Specialty::Psychiatry => (23, 8, 60),
            Specialty::Pediatrics => (27, 9, 80),
            Specialty::ObGyn => (14, 5, 40),
            Specialty::Urology => (28, 8, 70),
            Specialty::Rehabilitation => (15, 5, 40),
            Specialty::Dental => (22, 6, 60),
            Specialty::Unknown => (20, 8, 70),
        };
        OutpatientDefaults {
            base,
            per_doctor,
            cap,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Specialty::GeneralInternal => "general internal",
            Specialty::Cardiology => "cardiology",
            Specialty::Gastroenterology => "gastroenterology",
            Specialty::Diabetes => "diabetes/endocrinology",
            Specialty::Neurology => "neurology",
            Specialty::Respiratory => "respiratory",
            Specialty::Surgery => "surgery",
            Specialty::Orthopedics => "orthopedics",
            Specialty::Dermatology => "dermatology",
            Specialty::Ophthalmology => "ophthalmology",
            Specialty::Otolaryngology => "otolaryngology",
            Specialty::Psychiatry => "psychiatry",
            Specialty::Pediatrics => "pediatrics",
            Specialty::ObGyn => "ob-gyn",
            Specialty::Urology => "urology",
            Specialty::Rehabilitation => "rehabilitation",
            Specialty::Dental => "dental",
            Specialty::Unknown => "unknown/other",
        }
    }

    /// Map a machine specialty tag from a search record.
    pub fn from_tag(tag: &str) -> Option<Specialty> {
        let t = tag.trim().to_ascii_lowercase();
        let s = match t.as_str() {
            "general" | "general_practitioner" | "internal" => Specialty::GeneralInternal,
            "cardiology" => Specialty::Cardiology,
            "gastroenterology" => Specialty::Gastroenterology,
            "diabetes" | "endocrinology" => Specialty::Diabetes,
            "neurology" => Specialty::Neurology,
            "pulmonology" | "respiratory" => Specialty::Respiratory,
            "surgery" => Specialty::Surgery,
            "orthopaedics" | "orthopedics" => Specialty::Orthopedics,
            "dermatology" => Specialty::Dermatology,
            "ophthalmology" => Specialty::Ophthalmology,
            "otolaryngology" | "ent" => Specialty::Otolaryngology,
            "psychiatry" | "mental_health" => Specialty::Psychiatry,
            "paediatrics" | "pediatrics" => Specialty::Pediatrics,
            "gynaecology" | "obstetrics" => Specialty::ObGyn,
            "urology" => Specialty::Urology,
            "rehabilitation" => Specialty::Rehabilitation,
            _ => return None,
        };
        Some(s)
    }

    /// Infer the specialty from a Japanese facility name. Longer, more
    /// specific keywords are checked first so that e.g. 整形外科 wins over
    /// 外科 and 循環器内科 wins over 内科.
    pub fn from_name(name: &str) -> Specialty {
        const KEYWORDS: &[(&[&str], Specialty)] = &[
            (&["整形外科"], Specialty::Orthopedics),
            (&["循環器"], Specialty::Cardiology),
            (&["消化器"], Specialty::Gastroenterology),
            (&["糖尿病"], Specialty::Diabetes),
            (&["呼吸器"], Specialty::Respiratory),
            (&["精神科", "心療内科"], Specialty::Psychiatry),
            (&["神経内科", "脳神経"], Specialty::Neurology),
            (&["外科"], Specialty::Surgery),
            (&["皮膚科"], Specialty::Dermatology),
            (&["泌尿器"], Specialty::Urology),
            (&["眼科"], Specialty::Ophthalmology),
            (&["耳鼻"], Specialty::Otolaryngology),
            (&["産婦人科", "婦人科"], Specialty::ObGyn),
            (&["小児科"], Specialty::Pediatrics),
            (&["歯科"], Specialty::Dental),
            (&["リハビリ"], Specialty::Rehabilitation),
            (&["内科"], Specialty::GeneralInternal),
        ];
        for (kws, specialty) in KEYWORDS {
            if kws.iter().any(|kw| name.contains(kw)) {
                return *specialty;
            }
        }
        Specialty::Unknown
    }
}

/// Hospital default daily outpatients by bed count.
fn hospital_daily_outpatients(beds: u32) -> u32 {
    if beds >= 300 {
        1_000
    } else if beds >= 100 {
        400
    } else {
        150
    }
}

/// Damping applied to observed-only clinic records: facilities known only
/// from map data skew smaller than the national facility-survey average.
const OBSERVED_RECORD_DAMPING: f64 = 0.85;
/// Hard floor for any default estimate.
const MIN_DAILY_OUTPATIENTS: u32 = 5;

/// Default daily outpatient estimate for a facility without a confirmed
/// count. Hospitals go by bed count; clinics by the specialty table,
/// `base + per_doctor × (doctors − 1)` when staffing is known, clamped to
/// `[5, cap]` after damping.
pub fn estimate_daily_outpatients(
    kind: FacilityKind,
    beds: u32,
    doctors: u32,
    specialty: Specialty,
) -> u32 {
    if kind == FacilityKind::Hospital {
        return hospital_daily_outpatients(beds);
    }
    let d = specialty.outpatient_defaults();
    let raw = if doctors >= 2 {
        d.base + d.per_doctor * (doctors - 1)
    } else {
        d.base
    };
    let damped = (raw as f64 * OBSERVED_RECORD_DAMPING) as u32;
    damped.clamp(MIN_DAILY_OUTPATIENTS, d.cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rx_rates_are_probabilities() {
        for s in [
            Specialty::GeneralInternal,
            Specialty::Cardiology,
            Specialty::Dental,
            Specialty::Unknown,
        ] {
            let r = s.rx_rate();
            assert!(r > 0.0 && r <= 1.0, "{s:?} rate {r}");
        }
    }

    #[test]
    fn test_name_detection_specific_before_generic() {
        assert_eq!(Specialty::from_name("田中整形外科"), Specialty::Orthopedics);
        assert_eq!(
            Specialty::from_name("山本循環器内科クリニック"),
            Specialty::Cardiology
        );
        assert_eq!(Specialty::from_name("佐藤内科医院"), Specialty::GeneralInternal);
        assert_eq!(Specialty::from_name("すずらん薬局"), Specialty::Unknown);
    }

    #[test]
    fn test_tag_mapping() {
        assert_eq!(Specialty::from_tag("Cardiology"), Some(Specialty::Cardiology));
        assert_eq!(Specialty::from_tag("ent"), Some(Specialty::Otolaryngology));
        assert_eq!(Specialty::from_tag("witchcraft"), None);
    }

    #[test]
    fn test_hospital_outpatients_by_beds() {
        assert_eq!(
            estimate_daily_outpatients(FacilityKind::Hospital, 450, 0, Specialty::Unknown),
            1_000
        );
        assert_eq!(
            estimate_daily_outpatients(FacilityKind::Hospital, 120, 0, Specialty::Unknown),
            400
        );
        assert_eq!(
            estimate_daily_outpatients(FacilityKind::Hospital, 19, 0, Specialty::Unknown),
            150
        );
    }

    #[test]
    fn test_clinic_single_doctor_uses_base() {
        // ophthalmology base 54, damped ×0.85 → 45
        let n = estimate_daily_outpatients(FacilityKind::Clinic, 0, 1, Specialty::Ophthalmology);
        assert_eq!(n, 45);
    }

    #[test]
    fn test_clinic_staffing_increment_and_cap() {
        // orthopedics: base 48 + 12×9 = 156, damped 132, capped at 120
        let n = estimate_daily_outpatients(FacilityKind::Clinic, 0, 10, Specialty::Orthopedics);
        assert_eq!(n, 120);
    }

    #[test]
    fn test_clinic_floor() {
        // ob-gyn base 14 damped to 11, above floor; rehab base 15 → 12
        let n = estimate_daily_outpatients(FacilityKind::Clinic, 0, 0, Specialty::ObGyn);
        assert!(n >= 5);
    }
}
