//! Nearest-neighbor matching over the reference cases.
//!
//! Distance is Euclidean in (age days, weight kg) space with no
//! normalization between the two axes. Similarity is `1 / (1 + distance)`.

use crate::models::{ReferenceCase, TreatmentMatch, TreatmentQuery};

/// Find the `query.top_n` reference cases closest to the query, best first.
///
/// Returns an empty vector when no case has the query's disease. A breed
/// filter that removes every candidate is ignored.
pub fn find_matches(cases: &[ReferenceCase], query: &TreatmentQuery) -> Vec<TreatmentMatch> {
    let by_disease: Vec<&ReferenceCase> = cases
        .iter()
        .filter(|c| c.is_disease(&query.disease))
        .collect();

    if by_disease.is_empty() {
        return Vec::new();
    }

    let candidates = match query.breed_preference() {
        Some(breed) => {
            let by_breed: Vec<&ReferenceCase> = by_disease
                .iter()
                .copied()
                .filter(|c| c.is_breed(breed))
                .collect();
            if by_breed.is_empty() {
                by_disease
            } else {
                by_breed
            }
        }
        None => by_disease,
    };

    let age = f64::from(query.age_days);
    let mut scored: Vec<(f64, &ReferenceCase)> = candidates
        .into_iter()
        .map(|c| (distance(c, age, query.weight_kg), c))
        .collect();

    // Stable sort: ties keep table order
    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .take(query.top_n)
        .map(|(distance, c)| TreatmentMatch {
            antibiotic: c.antibiotic.clone(),
            dosage_mg: c.dosage_mg,
            treatment_days: c.treatment_days,
            reference_age: c.age_days,
            reference_weight: c.weight_kg,
            reference_breed: c.breed.clone(),
            distance,
            similarity_score: similarity(distance),
        })
        .collect()
}

/// Euclidean distance between a case and a query point.
pub fn distance(case: &ReferenceCase, age_days: f64, weight_kg: f64) -> f64 {
    let d_age = case.age_days - age_days;
    let d_weight = case.weight_kg - weight_kg;
    (d_age * d_age + d_weight * d_weight).sqrt()
}

/// Inverse-distance similarity in (0, 1].
pub fn similarity(distance: f64) -> f64 {
    1.0 / (1.0 + distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(disease: &str, breed: Option<&str>, age: f64, weight: f64, antibiotic: &str) -> ReferenceCase {
        ReferenceCase {
            disease: disease.into(),
            breed: breed.map(Into::into),
            age_days: age,
            weight_kg: weight,
            antibiotic: antibiotic.into(),
            dosage_mg: 50.0,
            treatment_days: 5,
        }
    }

    fn cases() -> Vec<ReferenceCase> {
        vec![
            case("Coccidiosis", Some("Broiler"), 10.0, 0.5, "Amprolium"),
            case("Coccidiosis", Some("Layer"), 20.0, 1.0, "Sulfadimethoxine"),
            case("Coccidiosis", Some("Broiler"), 30.0, 1.5, "Toltrazuril"),
            case("Newcastle", Some("Layer"), 12.0, 0.6, "Doxycycline"),
        ]
    }

    #[test]
    fn test_ranks_by_distance() {
        let query = TreatmentQuery::new(22, 1.1, "Coccidiosis");
        let matches = find_matches(&cases(), &query);

        let names: Vec<_> = matches.iter().map(|m| m.antibiotic.as_str()).collect();
        assert_eq!(names, vec!["Sulfadimethoxine", "Toltrazuril", "Amprolium"]);
    }

    #[test]
    fn test_disease_filter_is_case_insensitive() {
        let query = TreatmentQuery::new(12, 0.6, "newcastle");
        let matches = find_matches(&cases(), &query);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].antibiotic, "Doxycycline");
    }

    #[test]
    fn test_unknown_disease_is_empty() {
        let query = TreatmentQuery::new(12, 0.6, "Avian Influenza");
        assert!(find_matches(&cases(), &query).is_empty());
        assert!(find_matches(&[], &query).is_empty());
    }

    #[test]
    fn test_breed_filter() {
        let query = TreatmentQuery::new(20, 1.0, "Coccidiosis").with_breed("broiler");
        let matches = find_matches(&cases(), &query);

        assert_eq!(matches.len(), 2);
        assert!(matches
            .iter()
            .all(|m| m.reference_breed.as_deref() == Some("Broiler")));
    }

    #[test]
    fn test_unknown_breed_reverts_to_disease_subset() {
        let query = TreatmentQuery::new(20, 1.0, "Coccidiosis").with_breed("Kadaknath");
        let matches = find_matches(&cases(), &query);

        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].antibiotic, "Sulfadimethoxine");
    }

    #[test]
    fn test_exact_match_scores_one() {
        let query = TreatmentQuery::new(10, 0.5, "Coccidiosis").with_top_n(1);
        let matches = find_matches(&cases(), &query);

        assert_eq!(matches[0].distance, 0.0);
        assert_eq!(matches[0].similarity_score, 1.0);
    }

    #[test]
    fn test_ties_keep_table_order() {
        let cases = vec![
            case("Coryza", None, 8.0, 1.0, "First"),
            case("Coryza", None, 12.0, 1.0, "Second"),
        ];
        let query = TreatmentQuery::new(10, 1.0, "Coryza");
        let matches = find_matches(&cases, &query);

        assert_eq!(matches[0].antibiotic, "First");
        assert_eq!(matches[1].antibiotic, "Second");
        assert_eq!(matches[0].distance, matches[1].distance);
    }

    #[test]
    fn test_top_n_limits_results() {
        let query = TreatmentQuery::new(20, 1.0, "Coccidiosis").with_top_n(1);
        assert_eq!(find_matches(&cases(), &query).len(), 1);
    }

    #[test]
    fn test_similarity_monotonic() {
        assert_eq!(similarity(0.0), 1.0);
        assert!(similarity(1.0) > similarity(2.0));
        assert!(similarity(1000.0) > 0.0);
    }
}
