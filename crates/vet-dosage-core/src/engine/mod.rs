//! Treatment recommendation engine.
//!
//! Pipeline: Disease filter → Nearest-neighbor match → Dosage plan → Persist

mod lookup;
mod matcher;
mod planner;

pub use lookup::*;
pub use matcher::*;
pub use planner::*;

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RecommendationConfig;
use crate::dataset::ReferenceData;
use crate::db::{Database, DbError};
use crate::models::{
    check_weight, AnimalDetails, AntibioticRequest, DiseaseAntibiotics, DiseaseProfile,
    DosageCalculation, DosageStandard, Recommendation, SuggestionResponse, TreatmentPlan,
    TreatmentQuery, ValidationError,
};
use crate::units::round_to;

/// Engine errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// A batch of antibiotics to plan and save for one farmer's animal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfirmRequest {
    pub farmer_id: String,
    pub doctor_id: String,
    pub animal: AnimalDetails,
    pub antibiotics: Vec<AntibioticRequest>,
}

/// Recommendation engine over shared, immutable reference data.
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    data: Arc<ReferenceData>,
    config: RecommendationConfig,
    planner: DosagePlanner,
}

impl RecommendationEngine {
    /// Create an engine with default tuning.
    pub fn new(data: Arc<ReferenceData>) -> Self {
        Self::with_config(data, RecommendationConfig::default())
    }

    pub fn with_config(data: Arc<ReferenceData>, config: RecommendationConfig) -> Self {
        let planner = DosagePlanner::new(config.fallback_treatment_days);
        Self {
            data,
            config,
            planner,
        }
    }

    /// Get the reference data for direct access.
    pub fn data(&self) -> &ReferenceData {
        &self.data
    }

    pub fn config(&self) -> &RecommendationConfig {
        &self.config
    }

    /// Ranked reference cases for an animal.
    pub fn suggest(&self, query: &TreatmentQuery) -> EngineResult<SuggestionResponse> {
        query.validate()?;
        let matches = find_matches(self.data.cases(), query);
        debug!(
            disease = %query.disease,
            age_days = query.age_days,
            weight_kg = query.weight_kg,
            matches = matches.len(),
            "Suggestions computed"
        );
        Ok(SuggestionResponse::from_matches(matches))
    }

    /// Plan every requested antibiotic, starting today. Nothing is saved.
    pub fn preview(&self, animal: &AnimalDetails, requests: &[AntibioticRequest]) -> EngineResult<Vec<TreatmentPlan>> {
        self.plan_all(animal, requests, Local::now().date_naive())
    }

    /// Plan every requested antibiotic from a given start date.
    pub fn plan_all(
        &self,
        animal: &AnimalDetails,
        requests: &[AntibioticRequest],
        start_date: NaiveDate,
    ) -> EngineResult<Vec<TreatmentPlan>> {
        animal.validate()?;
        if requests.is_empty() {
            return Err(ValidationError::NoAntibiotics.into());
        }

        let query = animal.query(1);
        let best = find_matches(self.data.cases(), &query).into_iter().next();
        if best.is_none() {
            debug!(disease = %animal.disease, "No reference case, using fallback dosing");
        }

        let plans = requests
            .iter()
            .map(|request| self.planner.plan(&query, request, best.as_ref(), start_date))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    /// Plan and save a recommendation for an existing farmer.
    ///
    /// Every plan is computed before anything is written; the header and
    /// all items are then stored in one transaction.
    pub fn confirm(&self, db: &Database, request: &ConfirmRequest) -> EngineResult<Recommendation> {
        if db.get_farmer(&request.farmer_id)?.is_none() {
            return Err(EngineError::NotFound(format!("farmer {}", request.farmer_id)));
        }

        let plans = self.preview(&request.animal, &request.antibiotics)?;
        let items = plans
            .into_iter()
            .zip(&request.antibiotics)
            .map(|(plan, req)| (plan, req.notes.clone()))
            .collect();

        let mut rec = Recommendation::new(
            request.farmer_id.clone(),
            request.doctor_id.clone(),
            &request.animal,
            items,
        );
        rec.dataset_fingerprint = self.data.fingerprint().map(str::to_string);

        db.insert_recommendation(&rec)?;
        info!(
            recommendation_id = %rec.id,
            disease = %rec.disease,
            antibiotics = rec.items.len(),
            "Recommendation confirmed"
        );
        Ok(rec)
    }

    /// Distinct dataset diseases, sorted.
    pub fn list_diseases(&self) -> Vec<String> {
        self.data.dataset().diseases()
    }

    /// Aggregated profile for an exact disease name.
    pub fn disease_profile(&self, disease: &str) -> Option<&DiseaseProfile> {
        self.data.disease_index().get(disease)
    }

    /// Antibiotics to offer for a disease name.
    pub fn antibiotics_for_disease(&self, disease: &str) -> EngineResult<DiseaseAntibiotics> {
        Ok(antibiotics_for_disease(&self.data, disease)?)
    }

    /// Dosage standards for a category.
    pub fn dosage_standards(&self, category: &str) -> EngineResult<&[DosageStandard]> {
        let standards = self.data.dosage_standards();
        if !standards.has_category(category) {
            return Err(EngineError::NotFound(format!("category {}", category)));
        }
        Ok(standards.standards())
    }

    /// Total dose for a medicine by body weight, within the standard's bounds.
    pub fn auto_dosage(&self, category: &str, medicine: &str, weight_kg: f64) -> EngineResult<DosageCalculation> {
        check_weight(weight_kg)?;
        let standard = self
            .dosage_standards(category)?
            .iter()
            .find(|s| s.antibiotic == medicine)
            .ok_or_else(|| {
                warn!(category, medicine, "No dosage standard");
                EngineError::NotFound(format!("medicine {} in category {}", medicine, category))
            })?;

        let total = standard.clamp_total(round_to(standard.base_dosage_per_kg_ml * weight_kg, 1));
        Ok(DosageCalculation {
            medicine: standard.antibiotic.clone(),
            category: category.to_string(),
            weight_kg,
            total_dosage_ml: total,
            frequency: standard.frequency_note(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, DEFAULT_CATEGORY};
    use crate::models::{Farmer, PlanSource, ReferenceCase};

    fn case(disease: &str, age: f64, weight: f64, antibiotic: &str, dosage: f64, days: u32) -> ReferenceCase {
        ReferenceCase {
            disease: disease.into(),
            breed: None,
            age_days: age,
            weight_kg: weight,
            antibiotic: antibiotic.into(),
            dosage_mg: dosage,
            treatment_days: days,
        }
    }

    fn engine() -> RecommendationEngine {
        let cases = vec![
            case("Coccidiosis", 10.0, 0.5, "Amprolium", 50.0, 5),
            case("Coccidiosis", 20.0, 1.0, "Sulfadimethoxine", 80.0, 7),
            case("Newcastle", 30.0, 1.5, "Doxycycline", 120.0, 6),
        ];
        let data = ReferenceData::build(Dataset::from_cases(cases), DEFAULT_CATEGORY);
        RecommendationEngine::new(Arc::new(data))
    }

    fn animal(disease: &str) -> AnimalDetails {
        AnimalDetails {
            disease: disease.into(),
            animal_type: "Broiler".into(),
            age_days: 12,
            weight_kg: 0.6,
        }
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_suggest() {
        let engine = engine();
        let response = engine
            .suggest(&TreatmentQuery::new(12, 0.6, "Coccidiosis"))
            .unwrap();
        assert!(response.success);
        assert_eq!(response.suggestions[0].antibiotic, "Amprolium");

        let empty = engine
            .suggest(&TreatmentQuery::new(12, 0.6, "Avian Influenza"))
            .unwrap();
        assert!(!empty.success);
        assert_eq!(
            empty.error.as_deref(),
            Some("No treatment suggestions found for the given parameters")
        );
    }

    #[test]
    fn test_suggest_rejects_invalid_query() {
        let result = engine().suggest(&TreatmentQuery::new(0, 0.6, "Coccidiosis"));
        assert!(matches!(
            result,
            Err(EngineError::Validation(ValidationError::NonPositiveAge))
        ));
    }

    #[test]
    fn test_plan_all_uses_nearest_case_for_every_antibiotic() {
        let plans = engine()
            .plan_all(
                &animal("Coccidiosis"),
                &[
                    AntibioticRequest::new("Amprolium"),
                    AntibioticRequest::new("Toltrazuril").with_frequency(1),
                ],
                start(),
            )
            .unwrap();

        assert_eq!(plans.len(), 2);
        assert!(plans.iter().all(|p| p.source == PlanSource::Ai));
        // Nearest case is Amprolium 50 mg / 5 days
        assert!(plans.iter().all(|p| p.single_dose_ml == 5.0 && p.treatment_days == 5));
        assert_eq!(plans[1].antibiotic, "Toltrazuril");
        assert_eq!(plans[1].frequency_description, "Once daily for 5 days");
    }

    #[test]
    fn test_plan_all_fallback_for_unknown_disease() {
        let plans = engine()
            .plan_all(&animal("Marek"), &[AntibioticRequest::new("Doxycycline")], start())
            .unwrap();
        assert_eq!(plans[0].source, PlanSource::Fallback);
        assert_eq!(plans[0].single_dose_ml, 1.0);
        assert_eq!(plans[0].treatment_days, 7);
    }

    #[test]
    fn test_plan_all_requires_antibiotics() {
        assert!(matches!(
            engine().plan_all(&animal("Coccidiosis"), &[], start()),
            Err(EngineError::Validation(ValidationError::NoAntibiotics))
        ));
    }

    #[test]
    fn test_configured_fallback_days() {
        let data = Arc::new(ReferenceData::unavailable(DEFAULT_CATEGORY));
        let config = RecommendationConfig {
            fallback_treatment_days: 3,
            ..RecommendationConfig::default()
        };
        let engine = RecommendationEngine::with_config(data, config);

        let plans = engine
            .plan_all(&animal("Coccidiosis"), &[AntibioticRequest::new("Amprolium")], start())
            .unwrap();
        assert_eq!(plans[0].treatment_days, 3);
        assert_eq!(plans[0].source, PlanSource::Fallback);
    }

    #[test]
    fn test_confirm_saves_everything() {
        let engine = engine();
        let db = Database::open_in_memory().unwrap();
        let farmer = Farmer::new("Ravi".into(), "9876543210".into());
        db.insert_farmer(&farmer).unwrap();

        let mut with_notes = AntibioticRequest::new("Sulfadimethoxine");
        with_notes.notes = Some("mix in water".into());
        let request = ConfirmRequest {
            farmer_id: farmer.id.clone(),
            doctor_id: "d1".into(),
            animal: animal("Coccidiosis"),
            antibiotics: vec![AntibioticRequest::new("Amprolium"), with_notes],
        };

        let rec = engine.confirm(&db, &request).unwrap();
        assert_eq!(rec.items.len(), 2);
        assert_eq!(rec.items[1].notes.as_deref(), Some("mix in water"));
        assert_eq!(
            rec.dataset_fingerprint.as_deref(),
            engine.data().fingerprint()
        );

        let saved = db.get_recommendation(&rec.id).unwrap().unwrap();
        assert_eq!(saved, rec);
    }

    #[test]
    fn test_confirm_unknown_farmer() {
        let db = Database::open_in_memory().unwrap();
        let request = ConfirmRequest {
            farmer_id: "missing".into(),
            doctor_id: "d1".into(),
            animal: animal("Coccidiosis"),
            antibiotics: vec![AntibioticRequest::new("Amprolium")],
        };
        assert!(matches!(
            engine().confirm(&db, &request),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn test_confirm_invalid_request_saves_nothing() {
        let engine = engine();
        let db = Database::open_in_memory().unwrap();
        let farmer = Farmer::new("Ravi".into(), "9876543210".into());
        db.insert_farmer(&farmer).unwrap();

        let request = ConfirmRequest {
            farmer_id: farmer.id.clone(),
            doctor_id: "d1".into(),
            animal: animal("Coccidiosis"),
            antibiotics: vec![
                AntibioticRequest::new("Amprolium"),
                AntibioticRequest::new("Doxycycline").with_frequency(0),
            ],
        };
        assert!(matches!(
            engine.confirm(&db, &request),
            Err(EngineError::Validation(ValidationError::ZeroFrequency))
        ));
        assert!(db.list_recommendations_for_farmer(&farmer.id).unwrap().is_empty());
    }

    #[test]
    fn test_listings() {
        let engine = engine();
        assert_eq!(engine.list_diseases(), vec!["Coccidiosis", "Newcastle"]);
        assert_eq!(
            engine.disease_profile("Coccidiosis").unwrap().primary_antibiotic,
            "Amprolium"
        );
        assert_eq!(engine.dosage_standards("Poultry").unwrap().len(), 3);
        assert!(matches!(
            engine.dosage_standards("Cattle"),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn test_auto_dosage() {
        let engine = engine();
        // Amprolium: 100 mg/kg -> 10 mL/kg; bounds [5.0, 5.0]
        let calc = engine.auto_dosage("Poultry", "Amprolium", 0.3).unwrap();
        assert_eq!(calc.total_dosage_ml, 5.0);
        assert_eq!(calc.frequency, "Based on reference dataset - Average 5 days treatment");

        assert!(matches!(
            engine.auto_dosage("Poultry", "Penicillin", 1.0),
            Err(EngineError::NotFound(_))
        ));
        assert!(matches!(
            engine.auto_dosage("Poultry", "Amprolium", 0.0),
            Err(EngineError::Validation(ValidationError::NonPositiveWeight(_)))
        ));
    }
}
