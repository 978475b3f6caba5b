//! Treatment query, match, and plan models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::validation::{check_weight, require_text, ValidationError, ValidationResult};

/// Default number of suggestions returned for a query.
pub const DEFAULT_TOP_N: usize = 3;

/// Default administrations per day when the caller does not say.
pub const DEFAULT_DAILY_FREQUENCY: u32 = 2;

/// A request for treatment suggestions for one animal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreatmentQuery {
    pub age_days: u32,
    pub weight_kg: f64,
    pub disease: String,
    /// Soft preference; ignored when no case of that breed exists
    pub breed: Option<String>,
    pub top_n: usize,
}

impl TreatmentQuery {
    /// Create a query with the default `top_n`.
    pub fn new(age_days: u32, weight_kg: f64, disease: impl Into<String>) -> Self {
        Self {
            age_days,
            weight_kg,
            disease: disease.into(),
            breed: None,
            top_n: DEFAULT_TOP_N,
        }
    }

    pub fn with_breed(mut self, breed: impl Into<String>) -> Self {
        self.breed = Some(breed.into());
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Reject malformed queries before any computation.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.age_days == 0 {
            return Err(ValidationError::NonPositiveAge);
        }
        check_weight(self.weight_kg)?;
        require_text(&self.disease, "disease")?;
        if self.top_n == 0 {
            return Err(ValidationError::ZeroTopN);
        }
        Ok(())
    }

    /// Blank breed strings count as "no preference".
    pub fn breed_preference(&self) -> Option<&str> {
        self.breed.as_deref().map(str::trim).filter(|b| !b.is_empty())
    }
}

/// A reference case ranked against a query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreatmentMatch {
    pub antibiotic: String,
    pub dosage_mg: f64,
    pub treatment_days: u32,
    pub reference_age: f64,
    pub reference_weight: f64,
    pub reference_breed: Option<String>,
    /// Euclidean distance in (age, weight) space
    pub distance: f64,
    /// 1 / (1 + distance), in (0, 1]
    pub similarity_score: f64,
}

/// Where a plan's dose and duration came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlanSource {
    /// Derived from the nearest reference case
    #[serde(rename = "AI")]
    Ai,
    /// Weight-proportional heuristic
    Fallback,
}

impl PlanSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanSource::Ai => "AI",
            PlanSource::Fallback => "Fallback",
        }
    }

    /// Allowed single-dose range in mL.
    pub fn dose_bounds(&self) -> (f64, f64) {
        match self {
            PlanSource::Ai => (1.0, 15.0),
            PlanSource::Fallback => (1.0, 10.0),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ai" => Some(PlanSource::Ai),
            "fallback" => Some(PlanSource::Fallback),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlanSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The animal a batch of antibiotic plans is for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimalDetails {
    pub disease: String,
    /// Free-form animal type (e.g. "Broiler", "Layer")
    pub animal_type: String,
    pub age_days: u32,
    pub weight_kg: f64,
}

impl AnimalDetails {
    pub fn validate(&self) -> ValidationResult<()> {
        require_text(&self.disease, "disease")?;
        require_text(&self.animal_type, "animal_type")?;
        self.query(1).validate()
    }

    /// Matcher query for this animal. Breed is not part of the plan lookup.
    pub fn query(&self, top_n: usize) -> TreatmentQuery {
        TreatmentQuery::new(self.age_days, self.weight_kg, self.disease.clone()).with_top_n(top_n)
    }
}

/// One antibiotic the caller wants a plan for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AntibioticRequest {
    pub antibiotic: String,
    #[serde(default = "default_daily_frequency")]
    pub daily_frequency: u32,
    /// Explicit duration (e.g. from a preview); also the fallback default
    #[serde(default)]
    pub treatment_days: Option<u32>,
    /// Explicit single dose in mL (e.g. from a preview)
    #[serde(default)]
    pub single_dose_ml: Option<f64>,
    /// Source asserted alongside explicit values
    #[serde(default)]
    pub source: Option<PlanSource>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_daily_frequency() -> u32 {
    DEFAULT_DAILY_FREQUENCY
}

impl AntibioticRequest {
    pub fn new(antibiotic: impl Into<String>) -> Self {
        Self {
            antibiotic: antibiotic.into(),
            daily_frequency: DEFAULT_DAILY_FREQUENCY,
            treatment_days: None,
            single_dose_ml: None,
            source: None,
            notes: None,
        }
    }

    pub fn with_frequency(mut self, daily_frequency: u32) -> Self {
        self.daily_frequency = daily_frequency;
        self
    }

    /// Attach values returned by an earlier preview.
    pub fn with_explicit(mut self, treatment_days: u32, single_dose_ml: f64, source: PlanSource) -> Self {
        self.treatment_days = Some(treatment_days);
        self.single_dose_ml = Some(single_dose_ml);
        self.source = Some(source);
        self
    }

    /// Explicit days and dose, when both are present and non-zero.
    pub fn explicit_values(&self) -> Option<(u32, f64)> {
        let days = self.treatment_days.filter(|d| *d > 0)?;
        let dose = self.single_dose_ml.filter(|d| *d != 0.0)?;
        Some((days, dose))
    }
}

/// Concrete dosage schedule for one antibiotic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreatmentPlan {
    pub antibiotic: String,
    pub single_dose_ml: f64,
    pub daily_frequency: u32,
    pub treatment_days: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_daily_dosage_ml: f64,
    pub total_treatment_dosage_ml: f64,
    pub frequency_description: String,
    pub source: PlanSource,
}

/// Response shape for a suggestion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestionResponse {
    pub success: bool,
    pub suggestions: Vec<TreatmentMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SuggestionResponse {
    pub fn from_matches(suggestions: Vec<TreatmentMatch>) -> Self {
        if suggestions.is_empty() {
            Self {
                success: false,
                suggestions,
                error: Some("No treatment suggestions found for the given parameters".into()),
            }
        } else {
            Self {
                success: true,
                suggestions,
                error: None,
            }
        }
    }
}

/// Antibiotics offered for a disease selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiseaseAntibiotics {
    /// Sorted, de-duplicated antibiotic names
    pub antibiotics: Vec<String>,
    pub dataset_loaded: bool,
    /// Whether the dataset was searched for this disease
    pub dataset_used: bool,
}

/// Result of an automatic dosage calculation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DosageCalculation {
    pub medicine: String,
    pub category: String,
    pub weight_kg: f64,
    pub total_dosage_ml: f64,
    pub frequency: String,
}
