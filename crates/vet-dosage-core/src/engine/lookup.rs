//! Disease name to antibiotic list, tolerant of partial names and typos.

use std::collections::BTreeSet;

use strsim::jaro_winkler;

use crate::dataset::ReferenceData;
use crate::models::{require_text, DiseaseAntibiotics, ReferenceCase, ValidationResult};

/// Offered when there is no dataset at all.
pub const DEFAULT_ANTIBIOTICS: [&str; 3] = ["Amprolium", "Doxycycline", "Oxytetracycline"];

/// Number of dataset antibiotics offered when nothing matches.
const FALLBACK_LIST_LEN: usize = 3;

/// Minimum Jaro-Winkler similarity for a typo match.
const TYPO_THRESHOLD: f64 = 0.88;

/// Shortest disease-name word considered in word matching.
const MIN_WORD_LEN: usize = 4;

/// Antibiotics to offer for a disease name.
pub fn antibiotics_for_disease(data: &ReferenceData, disease: &str) -> ValidationResult<DiseaseAntibiotics> {
    require_text(disease, "disease")?;
    let name = disease.trim();

    let mut found = BTreeSet::new();

    if let Some(profile) = data.disease_index().get(name) {
        found.extend(profile.all_antibiotics());
    }
    found.extend(matching_cases(data, name).into_iter().map(|c| c.antibiotic.clone()));

    let antibiotics = if found.is_empty() {
        let mut defaults = default_antibiotics(data);
        defaults.sort();
        defaults
    } else {
        found.into_iter().collect()
    };

    Ok(DiseaseAntibiotics {
        antibiotics,
        dataset_loaded: data.is_loaded(),
        dataset_used: data.is_loaded(),
    })
}

/// Dataset rows for a disease name, trying progressively looser matches.
fn matching_cases<'a>(data: &'a ReferenceData, name: &str) -> Vec<&'a ReferenceCase> {
    let cases = data.cases();
    let query = name.to_lowercase();
    let select = |pred: &dyn Fn(&str) -> bool| -> Vec<&'a ReferenceCase> {
        cases
            .iter()
            .filter(|c| pred(&c.disease.to_lowercase()))
            .collect()
    };

    let exact = select(&|d| d == query);
    if !exact.is_empty() {
        return exact;
    }

    let partial = select(&|d| d.contains(&query));
    if !partial.is_empty() {
        return partial;
    }

    if query.contains("bacterial") || query.contains("infection") {
        // Only the generic "Bacterial" category, not every bacterial disease
        let bacterial = select(&|d| d == "bacterial");
        if !bacterial.is_empty() {
            return bacterial;
        }
    }

    let known = data.dataset().diseases();

    if let Some(disease) = known.iter().find(|d| {
        d.to_lowercase()
            .split_whitespace()
            .any(|w| w.len() >= MIN_WORD_LEN && query.contains(w))
    }) {
        return cases.iter().filter(|c| &c.disease == disease).collect();
    }

    let closest = known
        .iter()
        .map(|d| (jaro_winkler(&d.to_lowercase(), &query), d))
        .filter(|(score, _)| *score >= TYPO_THRESHOLD)
        .fold(None, |best: Option<(f64, &String)>, cur| match best {
            Some(b) if b.0 >= cur.0 => Some(b),
            _ => Some(cur),
        });

    match closest {
        Some((_, disease)) => cases.iter().filter(|c| &c.disease == disease).collect(),
        None => Vec::new(),
    }
}

fn default_antibiotics(data: &ReferenceData) -> Vec<String> {
    let from_dataset: Vec<String> = data
        .dataset()
        .antibiotics()
        .into_iter()
        .take(FALLBACK_LIST_LEN)
        .collect();

    if from_dataset.is_empty() {
        DEFAULT_ANTIBIOTICS.iter().map(|s| s.to_string()).collect()
    } else {
        from_dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, DEFAULT_CATEGORY};
    use crate::models::ValidationError;

    fn case(disease: &str, antibiotic: &str) -> ReferenceCase {
        ReferenceCase {
            disease: disease.into(),
            breed: None,
            age_days: 10.0,
            weight_kg: 1.0,
            antibiotic: antibiotic.into(),
            dosage_mg: 50.0,
            treatment_days: 5,
        }
    }

    fn data() -> ReferenceData {
        let cases = vec![
            case("Coccidiosis", "Amprolium"),
            case("Coccidiosis", "Toltrazuril"),
            case("Chronic Respiratory Disease", "Tylosin"),
            case("Chronic Respiratory Disease", "Doxycycline"),
            case("Bacterial Enteritis", "Enrofloxacin"),
            case("Fowl Cholera", "Oxytetracycline"),
            case("Bacterial", "Colistin"),
        ];
        ReferenceData::build(Dataset::from_cases(cases), DEFAULT_CATEGORY)
    }

    #[test]
    fn test_exact_disease() {
        let result = antibiotics_for_disease(&data(), "Coccidiosis").unwrap();
        assert_eq!(result.antibiotics, vec!["Amprolium", "Toltrazuril"]);
        assert!(result.dataset_loaded);
        assert!(result.dataset_used);
    }

    #[test]
    fn test_case_insensitive_and_partial() {
        let data = data();
        let lower = antibiotics_for_disease(&data, "coccidiosis").unwrap();
        assert_eq!(lower.antibiotics, vec!["Amprolium", "Toltrazuril"]);

        let partial = antibiotics_for_disease(&data, "respiratory").unwrap();
        assert_eq!(partial.antibiotics, vec!["Doxycycline", "Tylosin"]);
    }

    #[test]
    fn test_infection_keyword_maps_to_bacterial() {
        let result = antibiotics_for_disease(&data(), "Gut infection").unwrap();
        assert_eq!(result.antibiotics, vec!["Colistin"]);

        // "Bacterial Enteritis" is a specific disease, not the category
        let cases = vec![case("Bacterial Enteritis", "Enrofloxacin"), case("Coccidiosis", "Amprolium")];
        let data = ReferenceData::build(Dataset::from_cases(cases), DEFAULT_CATEGORY);
        let result = antibiotics_for_disease(&data, "Gut infection").unwrap();
        assert_eq!(result.antibiotics, vec!["Amprolium", "Enrofloxacin"]);
    }

    #[test]
    fn test_word_of_known_disease_in_query() {
        let result = antibiotics_for_disease(&data(), "suspected cholera outbreak").unwrap();
        assert_eq!(result.antibiotics, vec!["Oxytetracycline"]);
    }

    #[test]
    fn test_typo_tolerance() {
        let result = antibiotics_for_disease(&data(), "Coccidiosys").unwrap();
        assert_eq!(result.antibiotics, vec!["Amprolium", "Toltrazuril"]);
    }

    #[test]
    fn test_unknown_disease_gets_first_dataset_antibiotics() {
        let result = antibiotics_for_disease(&data(), "Marek").unwrap();
        assert_eq!(
            result.antibiotics,
            vec!["Amprolium", "Toltrazuril", "Tylosin"]
        );
        assert!(result.dataset_used);
    }

    #[test]
    fn test_no_dataset_defaults() {
        let data = ReferenceData::unavailable(DEFAULT_CATEGORY);
        let result = antibiotics_for_disease(&data, "Coccidiosis").unwrap();
        assert_eq!(
            result.antibiotics,
            vec!["Amprolium", "Doxycycline", "Oxytetracycline"]
        );
        assert!(!result.dataset_loaded);
        assert!(!result.dataset_used);
    }

    #[test]
    fn test_empty_name_rejected() {
        assert_eq!(
            antibiotics_for_disease(&data(), "   "),
            Err(ValidationError::MissingField("disease"))
        );
    }
}
