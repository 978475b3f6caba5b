//! Vet-Dosage Core Library
//!
//! Poultry antibiotic recommendation: nearest-neighbor matching against a
//! reference treatment dataset, dosage planning, and recommendation records.
//!
//! # Architecture
//!
//! ```text
//!   Reference CSV ──► Dataset ──► DiseaseIndex / DosageStandards
//!                                     │ (ReferenceData, shared via Arc)
//!                                     ▼
//!   TreatmentQuery ──► Matcher ──► top-N TreatmentMatch
//!                                     │
//!                                     ▼ best match or none
//!   AntibioticRequest ──► Planner ──► TreatmentPlan (AI | Fallback)
//!                                     │
//!                          ┌──────────┴──────────┐
//!                          ▼                     ▼
//!                       Preview          Confirm: header + items
//!                                         in one SQLite transaction
//!                                               │
//!                                               ▼
//!                                     Prescription export
//! ```
//!
//! # Modules
//!
//! - [`dataset`]: CSV loader, disease index, dosage standards
//! - [`engine`]: matcher, planner, disease lookup, request façade
//! - [`db`]: SQLite persistence for farmers and recommendations
//! - [`export`]: JSON / CSV prescriptions
//! - [`models`]: Domain types
//! - [`config`]: TOML service configuration
//! - [`logging`]: tracing subscriber setup

pub mod config;
pub mod dataset;
pub mod db;
pub mod engine;
pub mod export;
pub mod logging;
pub mod models;
pub mod units;

// Re-export commonly used types
pub use config::ServiceConfig;
pub use dataset::{Dataset, ReferenceData};
pub use db::Database;
pub use engine::{ConfirmRequest, RecommendationEngine};
pub use models::{
    AnimalDetails, AntibioticRequest, Farmer, PlanSource, Recommendation, TreatmentMatch,
    TreatmentPlan, TreatmentQuery,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use tracing::info;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum VetDosageError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Dataset error: {0}")]
    DatasetError(String),
}

impl From<db::DbError> for VetDosageError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => VetDosageError::NotFound(what),
            other => VetDosageError::DatabaseError(other.to_string()),
        }
    }
}

impl From<engine::EngineError> for VetDosageError {
    fn from(e: engine::EngineError) -> Self {
        match e {
            engine::EngineError::Validation(v) => v.into(),
            engine::EngineError::Database(d) => d.into(),
            engine::EngineError::NotFound(what) => VetDosageError::NotFound(what),
        }
    }
}

impl From<models::ValidationError> for VetDosageError {
    fn from(e: models::ValidationError) -> Self {
        VetDosageError::InvalidInput(e.to_string())
    }
}

impl From<config::ConfigError> for VetDosageError {
    fn from(e: config::ConfigError) -> Self {
        VetDosageError::ConfigError(e.to_string())
    }
}

impl From<dataset::DatasetError> for VetDosageError {
    fn from(e: dataset::DatasetError) -> Self {
        VetDosageError::DatasetError(e.to_string())
    }
}

impl From<serde_json::Error> for VetDosageError {
    fn from(e: serde_json::Error) -> Self {
        VetDosageError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for VetDosageError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        VetDosageError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open the service from a TOML config file, or defaults when `None`.
///
/// A missing or unreadable dataset is not an error: the service starts with
/// no reference data and plans with fallback dosing.
#[uniffi::export]
pub fn open_service(config_path: Option<String>) -> Result<Arc<VetDosageCore>, VetDosageError> {
    let config = ServiceConfig::load(config_path.as_deref().map(std::path::Path::new))?;
    let db = match &config.database.path {
        Some(path) => Database::open(path)?,
        None => Database::open_in_memory()?,
    };
    let data = ReferenceData::load_or_empty(&config.dataset.path, &config.dataset.category);
    Ok(Arc::new(VetDosageCore::new(data, config, db)))
}

/// Open the service with an in-memory database.
#[uniffi::export]
pub fn open_service_in_memory(dataset_path: Option<String>) -> Result<Arc<VetDosageCore>, VetDosageError> {
    let config = ServiceConfig::default();
    let data = match dataset_path {
        Some(path) => ReferenceData::load(path, &config.dataset.category)?,
        None => ReferenceData::unavailable(&config.dataset.category),
    };
    let db = Database::open_in_memory()?;
    Ok(Arc::new(VetDosageCore::new(data, config, db)))
}

/// Install the log subscriber. Returns false if one was already installed.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) -> bool {
    logging::init_logging(filter.as_deref())
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe service wrapper for FFI.
#[derive(uniffi::Object)]
pub struct VetDosageCore {
    engine: RecommendationEngine,
    db: Arc<Mutex<Database>>,
}

impl VetDosageCore {
    /// Assemble a service from loaded parts.
    pub fn new(data: ReferenceData, config: ServiceConfig, db: Database) -> Self {
        info!(
            dataset_loaded = data.is_loaded(),
            cases = data.cases().len(),
            "Vet-dosage service ready"
        );
        Self {
            engine: RecommendationEngine::with_config(Arc::new(data), config.recommendation),
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Get the engine for direct access.
    pub fn engine(&self) -> &RecommendationEngine {
        &self.engine
    }

    fn to_requests(&self, antibiotics: Vec<FfiAntibioticRequest>) -> Result<Vec<AntibioticRequest>, VetDosageError> {
        let default_frequency = self.engine.config().default_daily_frequency;
        antibiotics
            .into_iter()
            .map(|a| a.into_request(default_frequency))
            .collect()
    }
}

#[uniffi::export]
impl VetDosageCore {
    // =========================================================================
    // Reference Data
    // =========================================================================

    /// Summary of the loaded reference dataset.
    pub fn dataset_info(&self) -> FfiDatasetInfo {
        let data = self.engine.data();
        FfiDatasetInfo {
            loaded: data.is_loaded(),
            case_count: data.cases().len() as u32,
            disease_count: data.disease_index().len() as u32,
            fingerprint: data.fingerprint().map(str::to_string),
        }
    }

    /// Distinct diseases in the dataset, sorted.
    pub fn list_diseases(&self) -> Vec<String> {
        self.engine.list_diseases()
    }

    /// Antibiotics to offer for a (possibly partial or misspelled) disease.
    pub fn antibiotics_for_disease(&self, disease: String) -> Result<FfiDiseaseAntibiotics, VetDosageError> {
        Ok(self.engine.antibiotics_for_disease(&disease)?.into())
    }

    /// Dosage standards for a category.
    pub fn dosage_standards(&self, category: String) -> Result<Vec<FfiDosageStandard>, VetDosageError> {
        let standards = self.engine.dosage_standards(&category)?;
        Ok(standards.iter().cloned().map(Into::into).collect())
    }

    /// Weight-based total dose for a medicine.
    pub fn auto_dosage(
        &self,
        category: String,
        medicine: String,
        weight_kg: f64,
    ) -> Result<FfiDosageCalculation, VetDosageError> {
        Ok(self.engine.auto_dosage(&category, &medicine, weight_kg)?.into())
    }

    // =========================================================================
    // Recommendation Operations
    // =========================================================================

    /// Closest reference cases for an animal.
    pub fn suggest_treatments(
        &self,
        age_days: u32,
        weight_kg: f64,
        disease: String,
        breed: Option<String>,
        top_n: Option<u32>,
    ) -> Result<FfiSuggestionResponse, VetDosageError> {
        let mut query = TreatmentQuery::new(age_days, weight_kg, disease)
            .with_top_n(top_n.map(|n| n as usize).unwrap_or(self.engine.config().top_n));
        query.breed = breed;
        Ok(self.engine.suggest(&query)?.into())
    }

    /// Compute plans without saving them.
    pub fn preview_plans(
        &self,
        animal: FfiAnimalDetails,
        antibiotics: Vec<FfiAntibioticRequest>,
    ) -> Result<Vec<FfiTreatmentPlan>, VetDosageError> {
        let requests = self.to_requests(antibiotics)?;
        let plans = self.engine.preview(&animal.into(), &requests)?;
        Ok(plans.into_iter().map(Into::into).collect())
    }

    /// Compute and save a recommendation for a farmer.
    pub fn confirm_recommendation(
        &self,
        farmer_id: String,
        doctor_id: String,
        animal: FfiAnimalDetails,
        antibiotics: Vec<FfiAntibioticRequest>,
    ) -> Result<FfiRecommendation, VetDosageError> {
        let request = ConfirmRequest {
            farmer_id,
            doctor_id,
            animal: animal.into(),
            antibiotics: self.to_requests(antibiotics)?,
        };
        let db = self.db.lock()?;
        let rec = self.engine.confirm(&db, &request)?;
        Ok(rec.into())
    }

    /// Get a saved recommendation.
    pub fn get_recommendation(&self, id: String) -> Result<Option<FfiRecommendation>, VetDosageError> {
        let db = self.db.lock()?;
        Ok(db.get_recommendation(&id)?.map(Into::into))
    }

    /// Recommendations for a farmer, newest first.
    pub fn list_recommendations_for_farmer(&self, farmer_id: String) -> Result<Vec<FfiRecommendation>, VetDosageError> {
        let db = self.db.lock()?;
        let recs = db.list_recommendations_for_farmer(&farmer_id)?;
        Ok(recs.into_iter().map(Into::into).collect())
    }

    /// Recommendations written by a doctor, newest first.
    pub fn list_recommendations_for_doctor(&self, doctor_id: String) -> Result<Vec<FfiRecommendation>, VetDosageError> {
        let db = self.db.lock()?;
        let recs = db.list_recommendations_for_doctor(&doctor_id)?;
        Ok(recs.into_iter().map(Into::into).collect())
    }

    /// Recommendations not yet dispensed.
    pub fn list_unclaimed_recommendations(&self) -> Result<Vec<FfiRecommendation>, VetDosageError> {
        let db = self.db.lock()?;
        let recs = db.list_unclaimed_recommendations()?;
        Ok(recs.into_iter().map(Into::into).collect())
    }

    /// Mark a recommendation as dispensed.
    pub fn claim_recommendation(&self, id: String, claimed_by: String) -> Result<(), VetDosageError> {
        let db = self.db.lock()?;
        db.claim_recommendation(&id, &claimed_by)?;
        Ok(())
    }

    /// Undo a claim. Returns false if it was not claimed.
    pub fn unclaim_recommendation(&self, id: String) -> Result<bool, VetDosageError> {
        let db = self.db.lock()?;
        Ok(db.unclaim_recommendation(&id)?)
    }

    /// Delete a recommendation and its items.
    pub fn delete_recommendation(&self, id: String) -> Result<bool, VetDosageError> {
        let db = self.db.lock()?;
        Ok(db.delete_recommendation(&id)?)
    }

    // =========================================================================
    // Farmer Operations
    // =========================================================================

    /// Register a farmer.
    pub fn create_farmer(
        &self,
        name: String,
        mobile_no: String,
        area: Option<String>,
        pincode: Option<String>,
        doctor_id: Option<String>,
    ) -> Result<FfiFarmer, VetDosageError> {
        let mut farmer = Farmer::new(name, mobile_no);
        farmer.area = area;
        farmer.pincode = pincode;
        farmer.doctor_id = doctor_id;
        farmer.validate()?;

        let db = self.db.lock()?;
        db.insert_farmer(&farmer)?;
        Ok(farmer.into())
    }

    /// Get a farmer by ID.
    pub fn get_farmer(&self, id: String) -> Result<Option<FfiFarmer>, VetDosageError> {
        let db = self.db.lock()?;
        Ok(db.get_farmer(&id)?.map(Into::into))
    }

    /// Get a farmer by mobile number.
    pub fn get_farmer_by_mobile(&self, mobile_no: String) -> Result<Option<FfiFarmer>, VetDosageError> {
        let db = self.db.lock()?;
        Ok(db.get_farmer_by_mobile(&mobile_no)?.map(Into::into))
    }

    /// Farmers registered by a doctor.
    pub fn list_farmers_for_doctor(&self, doctor_id: String) -> Result<Vec<FfiFarmer>, VetDosageError> {
        let db = self.db.lock()?;
        let farmers = db.list_farmers_for_doctor(&doctor_id)?;
        Ok(farmers.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Export a recommendation as a JSON prescription.
    pub fn export_prescription_json(&self, recommendation_id: String) -> Result<String, VetDosageError> {
        let db = self.db.lock()?;
        let exporter = export::PrescriptionExporter::new(&db);
        Ok(exporter.export_by_id(&recommendation_id)?.to_json()?)
    }

    /// Export a recommendation as CSV.
    pub fn export_prescription_csv(&self, recommendation_id: String) -> Result<String, VetDosageError> {
        let db = self.db.lock()?;
        let exporter = export::PrescriptionExporter::new(&db);
        Ok(exporter.export_by_id(&recommendation_id)?.to_csv())
    }

    /// Export every recommendation for a farmer as CSV.
    pub fn export_farmer_prescriptions_csv(&self, farmer_id: String) -> Result<String, VetDosageError> {
        let db = self.db.lock()?;
        let exporter = export::PrescriptionExporter::new(&db);
        Ok(exporter.export_for_farmer(&farmer_id)?.to_csv())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe dataset summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDatasetInfo {
    pub loaded: bool,
    pub case_count: u32,
    pub disease_count: u32,
    pub fingerprint: Option<String>,
}

/// FFI-safe animal description.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAnimalDetails {
    pub disease: String,
    pub animal_type: String,
    pub age_days: u32,
    pub weight_kg: f64,
}

impl From<FfiAnimalDetails> for AnimalDetails {
    fn from(animal: FfiAnimalDetails) -> Self {
        AnimalDetails {
            disease: animal.disease,
            animal_type: animal.animal_type,
            age_days: animal.age_days,
            weight_kg: animal.weight_kg,
        }
    }
}

/// FFI-safe antibiotic request.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAntibioticRequest {
    pub antibiotic: String,
    pub daily_frequency: Option<u32>,
    pub treatment_days: Option<u32>,
    pub single_dose_ml: Option<f64>,
    /// "AI" or "Fallback"
    pub source: Option<String>,
    pub notes: Option<String>,
}

impl FfiAntibioticRequest {
    fn into_request(self, default_frequency: u32) -> Result<AntibioticRequest, VetDosageError> {
        let source = match self.source.as_deref() {
            Some(s) => Some(
                PlanSource::parse(s)
                    .ok_or_else(|| VetDosageError::InvalidInput(format!("Unknown plan source: {}", s)))?,
            ),
            None => None,
        };
        Ok(AntibioticRequest {
            antibiotic: self.antibiotic,
            daily_frequency: self.daily_frequency.unwrap_or(default_frequency),
            treatment_days: self.treatment_days,
            single_dose_ml: self.single_dose_ml,
            source,
            notes: self.notes,
        })
    }
}

/// FFI-safe ranked reference case.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTreatmentMatch {
    pub antibiotic: String,
    pub dosage_mg: f64,
    pub treatment_days: u32,
    pub reference_age: f64,
    pub reference_weight: f64,
    pub reference_breed: Option<String>,
    pub distance: f64,
    pub similarity_score: f64,
}

impl From<TreatmentMatch> for FfiTreatmentMatch {
    fn from(m: TreatmentMatch) -> Self {
        Self {
            antibiotic: m.antibiotic,
            dosage_mg: m.dosage_mg,
            treatment_days: m.treatment_days,
            reference_age: m.reference_age,
            reference_weight: m.reference_weight,
            reference_breed: m.reference_breed,
            distance: m.distance,
            similarity_score: m.similarity_score,
        }
    }
}

/// FFI-safe suggestion response.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSuggestionResponse {
    pub success: bool,
    pub suggestions: Vec<FfiTreatmentMatch>,
    pub error: Option<String>,
}

impl From<models::SuggestionResponse> for FfiSuggestionResponse {
    fn from(response: models::SuggestionResponse) -> Self {
        Self {
            success: response.success,
            suggestions: response.suggestions.into_iter().map(Into::into).collect(),
            error: response.error,
        }
    }
}

/// FFI-safe treatment plan. Dates are YYYY-MM-DD.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTreatmentPlan {
    pub antibiotic: String,
    pub single_dose_ml: f64,
    pub daily_frequency: u32,
    pub treatment_days: u32,
    pub start_date: String,
    pub end_date: String,
    pub total_daily_dosage_ml: f64,
    pub total_treatment_dosage_ml: f64,
    pub frequency_description: String,
    pub source: String,
}

impl From<TreatmentPlan> for FfiTreatmentPlan {
    fn from(plan: TreatmentPlan) -> Self {
        Self {
            antibiotic: plan.antibiotic,
            single_dose_ml: plan.single_dose_ml,
            daily_frequency: plan.daily_frequency,
            treatment_days: plan.treatment_days,
            start_date: plan.start_date.to_string(),
            end_date: plan.end_date.to_string(),
            total_daily_dosage_ml: plan.total_daily_dosage_ml,
            total_treatment_dosage_ml: plan.total_treatment_dosage_ml,
            frequency_description: plan.frequency_description,
            source: plan.source.to_string(),
        }
    }
}

/// FFI-safe saved recommendation.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRecommendation {
    pub id: String,
    pub farmer_id: String,
    pub doctor_id: String,
    pub disease: String,
    pub animal_type: String,
    pub weight_kg: f64,
    pub age_days: u32,
    pub is_claimed: bool,
    pub claimed_by: Option<String>,
    pub dataset_fingerprint: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<FfiRecommendationItem>,
    pub created_at: String,
}

/// FFI-safe recommendation item.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRecommendationItem {
    pub id: String,
    pub position: u32,
    pub plan: FfiTreatmentPlan,
    pub notes: Option<String>,
}

impl From<Recommendation> for FfiRecommendation {
    fn from(rec: Recommendation) -> Self {
        Self {
            id: rec.id,
            farmer_id: rec.farmer_id,
            doctor_id: rec.doctor_id,
            disease: rec.disease,
            animal_type: rec.animal_type,
            weight_kg: rec.weight_kg,
            age_days: rec.age_days,
            is_claimed: rec.is_claimed,
            claimed_by: rec.claimed_by,
            dataset_fingerprint: rec.dataset_fingerprint,
            notes: rec.notes,
            items: rec
                .items
                .into_iter()
                .map(|item| FfiRecommendationItem {
                    id: item.id,
                    position: item.position,
                    plan: item.plan.into(),
                    notes: item.notes,
                })
                .collect(),
            created_at: rec.created_at,
        }
    }
}

/// FFI-safe farmer.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFarmer {
    pub id: String,
    pub name: String,
    pub mobile_no: String,
    pub area: Option<String>,
    pub pincode: Option<String>,
    pub doctor_id: Option<String>,
}

impl From<Farmer> for FfiFarmer {
    fn from(farmer: Farmer) -> Self {
        Self {
            id: farmer.id,
            name: farmer.name,
            mobile_no: farmer.mobile_no,
            area: farmer.area,
            pincode: farmer.pincode,
            doctor_id: farmer.doctor_id,
        }
    }
}

/// FFI-safe antibiotic list for a disease.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDiseaseAntibiotics {
    pub antibiotics: Vec<String>,
    pub dataset_loaded: bool,
    pub dataset_used: bool,
}

impl From<models::DiseaseAntibiotics> for FfiDiseaseAntibiotics {
    fn from(result: models::DiseaseAntibiotics) -> Self {
        Self {
            antibiotics: result.antibiotics,
            dataset_loaded: result.dataset_loaded,
            dataset_used: result.dataset_used,
        }
    }
}

/// FFI-safe dosage standard.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDosageStandard {
    pub antibiotic: String,
    pub base_dosage_per_kg_ml: f64,
    pub min_total_dose_ml: f64,
    pub max_total_dose_ml: f64,
    pub frequency_note: String,
}

impl From<models::DosageStandard> for FfiDosageStandard {
    fn from(standard: models::DosageStandard) -> Self {
        let frequency_note = standard.frequency_note();
        Self {
            antibiotic: standard.antibiotic,
            base_dosage_per_kg_ml: standard.base_dosage_per_kg_ml,
            min_total_dose_ml: standard.min_total_dose_ml,
            max_total_dose_ml: standard.max_total_dose_ml,
            frequency_note,
        }
    }
}

/// FFI-safe dosage calculation.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDosageCalculation {
    pub medicine: String,
    pub category: String,
    pub weight_kg: f64,
    pub total_dosage_ml: f64,
    pub frequency: String,
}

impl From<models::DosageCalculation> for FfiDosageCalculation {
    fn from(calc: models::DosageCalculation) -> Self {
        Self {
            medicine: calc.medicine,
            category: calc.category,
            weight_kg: calc.weight_kg,
            total_dosage_ml: calc.total_dosage_ml,
            frequency: calc.frequency,
        }
    }
}
