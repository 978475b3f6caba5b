//! Reference dataset models.

use serde::{Deserialize, Serialize};

/// One historical treatment observation from the reference dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceCase {
    /// Disease name as written in the dataset
    pub disease: String,
    /// Breed, if recorded
    pub breed: Option<String>,
    /// Bird age in days
    pub age_days: f64,
    /// Bird weight in kg
    pub weight_kg: f64,
    /// Antibiotic given
    pub antibiotic: String,
    /// Dose given, in mg
    pub dosage_mg: f64,
    /// Course length in days
    pub treatment_days: u32,
}

impl ReferenceCase {
    /// Case-insensitive disease comparison.
    pub fn is_disease(&self, disease: &str) -> bool {
        self.disease.to_lowercase() == disease.to_lowercase()
    }

    /// Case-insensitive breed comparison. Cases without a breed never match.
    pub fn is_breed(&self, breed: &str) -> bool {
        self.breed
            .as_deref()
            .is_some_and(|b| b.to_lowercase() == breed.to_lowercase())
    }

    /// Dose per kg body weight, in mg/kg.
    pub fn dosage_mg_per_kg(&self) -> f64 {
        self.dosage_mg / self.weight_kg
    }
}

/// Aggregated treatment profile for one disease.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiseaseProfile {
    pub disease: String,
    /// Most frequently used antibiotic for the disease
    pub primary_antibiotic: String,
    /// Runner-up antibiotics by frequency (at most 3, never the primary)
    pub alternative_antibiotics: Vec<String>,
    /// Floor of the mean course length
    pub average_treatment_days: u32,
    /// Species category the profile belongs to (e.g. "Poultry")
    pub category: String,
}

impl DiseaseProfile {
    /// Primary followed by alternatives.
    pub fn all_antibiotics(&self) -> Vec<String> {
        let mut all = Vec::with_capacity(1 + self.alternative_antibiotics.len());
        all.push(self.primary_antibiotic.clone());
        all.extend(self.alternative_antibiotics.iter().cloned());
        all
    }

    /// Display note for selection lists.
    pub fn notes(&self) -> String {
        format!(
            "Based on reference dataset. Average treatment: {} days.",
            self.average_treatment_days
        )
    }
}

/// Per-antibiotic dosage standard derived from the dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DosageStandard {
    pub antibiotic: String,
    /// Mean dose per kg, converted to mL
    pub base_dosage_per_kg_ml: f64,
    /// Lower bound for a total dose, floored at 1.0 mL
    pub min_total_dose_ml: f64,
    /// Upper bound for a total dose
    pub max_total_dose_ml: f64,
    /// Floor of the mean course length for this antibiotic
    pub treatment_days_hint: u32,
}

impl DosageStandard {
    /// Human-readable frequency hint.
    pub fn frequency_note(&self) -> String {
        format!(
            "Based on reference dataset - Average {} days treatment",
            self.treatment_days_hint
        )
    }

    /// Clamp a total dose into this standard's bounds.
    pub fn clamp_total(&self, total_ml: f64) -> f64 {
        total_ml.max(self.min_total_dose_ml).min(self.max_total_dose_ml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(breed: Option<&str>) -> ReferenceCase {
        ReferenceCase {
            disease: "Coccidiosis".into(),
            breed: breed.map(Into::into),
            age_days: 10.0,
            weight_kg: 0.5,
            antibiotic: "Amprolium".into(),
            dosage_mg: 50.0,
            treatment_days: 5,
        }
    }

    #[test]
    fn test_disease_match_ignores_case() {
        let c = case(None);
        assert!(c.is_disease("coccidiosis"));
        assert!(c.is_disease("COCCIDIOSIS"));
        assert!(!c.is_disease("Newcastle"));
    }

    #[test]
    fn test_breed_match() {
        assert!(case(Some("Broiler")).is_breed("broiler"));
        assert!(!case(Some("Layer")).is_breed("broiler"));
        assert!(!case(None).is_breed("broiler"));
    }

    #[test]
    fn test_dosage_per_kg() {
        assert_eq!(case(None).dosage_mg_per_kg(), 100.0);
    }

    #[test]
    fn test_standard_clamp_and_note() {
        let standard = DosageStandard {
            antibiotic: "Amprolium".into(),
            base_dosage_per_kg_ml: 10.0,
            min_total_dose_ml: 1.0,
            max_total_dose_ml: 8.0,
            treatment_days_hint: 5,
        };
        assert_eq!(standard.clamp_total(0.2), 1.0);
        assert_eq!(standard.clamp_total(4.5), 4.5);
        assert_eq!(standard.clamp_total(20.0), 8.0);
        assert_eq!(
            standard.frequency_note(),
            "Based on reference dataset - Average 5 days treatment"
        );
    }
}
