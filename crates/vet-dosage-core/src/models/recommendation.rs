//! Persisted recommendation header and items.

use serde::{Deserialize, Serialize};

use super::treatment::{AnimalDetails, TreatmentPlan};

/// A saved multi-antibiotic recommendation for one animal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    /// Unique recommendation ID
    pub id: String,
    /// Farmer the recommendation was written for
    pub farmer_id: String,
    /// Doctor who wrote it
    pub doctor_id: String,
    pub disease: String,
    pub animal_type: String,
    pub weight_kg: f64,
    pub age_days: u32,
    /// Whether a shop has dispensed it
    pub is_claimed: bool,
    /// Shop/person that claimed it
    pub claimed_by: Option<String>,
    /// Fingerprint of the reference data that produced the plans
    pub dataset_fingerprint: Option<String>,
    pub notes: Option<String>,
    /// One entry per antibiotic, in request order
    pub items: Vec<RecommendationItem>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

/// One antibiotic plan within a recommendation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationItem {
    pub id: String,
    /// Zero-based position in the request
    pub position: u32,
    pub plan: TreatmentPlan,
    pub notes: Option<String>,
}

impl Recommendation {
    /// Build an unsaved recommendation from computed plans.
    pub fn new(
        farmer_id: String,
        doctor_id: String,
        animal: &AnimalDetails,
        plans: Vec<(TreatmentPlan, Option<String>)>,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        let items: Vec<RecommendationItem> = plans
            .into_iter()
            .enumerate()
            .map(|(position, (plan, notes))| RecommendationItem {
                id: uuid::Uuid::new_v4().to_string(),
                position: position as u32,
                plan,
                notes,
            })
            .collect();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            farmer_id,
            doctor_id,
            disease: animal.disease.clone(),
            animal_type: animal.animal_type.clone(),
            weight_kg: animal.weight_kg,
            age_days: animal.age_days,
            is_claimed: false,
            claimed_by: None,
            dataset_fingerprint: None,
            notes: Some(format!(
                "Multi-antibiotic treatment plan with {} medications",
                items.len()
            )),
            items,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Total volume across every item, in mL.
    pub fn total_volume_ml(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.plan.total_treatment_dosage_ml)
            .sum()
    }

    /// Serialize to JSON for hand-off to the display layer.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlanSource;
    use chrono::NaiveDate;

    fn plan(antibiotic: &str, total: f64) -> TreatmentPlan {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        TreatmentPlan {
            antibiotic: antibiotic.into(),
            single_dose_ml: 3.0,
            daily_frequency: 2,
            treatment_days: 5,
            start_date: start,
            end_date: NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
            total_daily_dosage_ml: 6.0,
            total_treatment_dosage_ml: total,
            frequency_description: "Twice daily for 5 days".into(),
            source: PlanSource::Ai,
        }
    }

    #[test]
    fn test_new_recommendation() {
        let animal = AnimalDetails {
            disease: "Coccidiosis".into(),
            animal_type: "Broiler".into(),
            age_days: 12,
            weight_kg: 0.6,
        };
        let rec = Recommendation::new(
            "farmer-1".into(),
            "doctor-1".into(),
            &animal,
            vec![
                (plan("Amprolium", 30.0), None),
                (plan("Doxycycline", 12.5), Some("after feed".into())),
            ],
        );

        assert_eq!(rec.items.len(), 2);
        assert_eq!(rec.items[0].position, 0);
        assert_eq!(rec.items[1].position, 1);
        assert_eq!(rec.items[1].notes.as_deref(), Some("after feed"));
        assert!(!rec.is_claimed);
        assert_eq!(
            rec.notes.as_deref(),
            Some("Multi-antibiotic treatment plan with 2 medications")
        );
        assert!((rec.total_volume_ml() - 42.5).abs() < 1e-9);
        assert_ne!(rec.items[0].id, rec.items[1].id);
    }
}
