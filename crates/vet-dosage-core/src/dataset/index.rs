//! Disease profiles and dosage standards derived from the reference cases.

use std::collections::HashMap;

use crate::models::{DiseaseProfile, DosageStandard, ReferenceCase};
use crate::units::{mg_to_ml, round_to};

/// Number of alternatives kept per disease.
const MAX_ALTERNATIVES: usize = 3;

/// Lower bound for a standard's minimum total dose, in mL.
const MIN_TOTAL_DOSE_FLOOR_ML: f64 = 1.0;

/// Per-disease antibiotic rankings, in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiseaseIndex {
    profiles: Vec<DiseaseProfile>,
    by_name: HashMap<String, usize>,
}

impl DiseaseIndex {
    /// Group cases by disease and rank antibiotics by frequency.
    pub fn build(cases: &[ReferenceCase], category: &str) -> Self {
        let groups = group_by(cases, |c| c.disease.as_str());

        let profiles: Vec<DiseaseProfile> = groups
            .into_iter()
            .map(|(disease, group)| {
                let mut counts = group_by(&group, |c| c.antibiotic.as_str())
                    .into_iter()
                    .map(|(antibiotic, rows)| (antibiotic, rows.len()))
                    .collect::<Vec<_>>();
                // Stable: equal counts keep first-appearance order
                counts.sort_by(|a, b| b.1.cmp(&a.1));

                let mut ranked = counts.into_iter().map(|(antibiotic, _)| antibiotic);
                let primary_antibiotic = ranked.next().unwrap_or_default();
                let alternative_antibiotics = ranked.take(MAX_ALTERNATIVES).collect();

                DiseaseProfile {
                    disease,
                    primary_antibiotic,
                    alternative_antibiotics,
                    average_treatment_days: mean_days(&group),
                    category: category.to_string(),
                }
            })
            .collect();

        let by_name = profiles
            .iter()
            .enumerate()
            .map(|(i, p)| (p.disease.clone(), i))
            .collect();

        Self { profiles, by_name }
    }

    /// Profile for an exact disease name.
    pub fn get(&self, disease: &str) -> Option<&DiseaseProfile> {
        self.by_name.get(disease).map(|&i| &self.profiles[i])
    }

    pub fn profiles(&self) -> &[DiseaseProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Dosage standards for one category, in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DosageStandards {
    category: String,
    standards: Vec<DosageStandard>,
    by_name: HashMap<String, usize>,
}

impl DosageStandards {
    /// Aggregate dose statistics per antibiotic across all diseases.
    pub fn build(cases: &[ReferenceCase], category: &str) -> Self {
        let standards: Vec<DosageStandard> = group_by(cases, |c| c.antibiotic.as_str())
            .into_iter()
            .map(|(antibiotic, group)| {
                let n = group.len() as f64;
                let mean_per_kg = group.iter().map(|c| c.dosage_mg_per_kg()).sum::<f64>() / n;
                let min_mg = group.iter().map(|c| c.dosage_mg).fold(f64::INFINITY, f64::min);
                let max_mg = group
                    .iter()
                    .map(|c| c.dosage_mg)
                    .fold(f64::NEG_INFINITY, f64::max);

                let min_total_dose_ml = round_to(mg_to_ml(min_mg), 1).max(MIN_TOTAL_DOSE_FLOOR_ML);
                let max_total_dose_ml = round_to(mg_to_ml(max_mg), 1).max(min_total_dose_ml);

                DosageStandard {
                    antibiotic,
                    base_dosage_per_kg_ml: round_to(mg_to_ml(mean_per_kg), 2),
                    min_total_dose_ml,
                    max_total_dose_ml,
                    treatment_days_hint: mean_days(&group),
                }
            })
            .collect();

        let by_name = standards
            .iter()
            .enumerate()
            .map(|(i, s)| (s.antibiotic.clone(), i))
            .collect();

        Self {
            category: category.to_string(),
            standards,
            by_name,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Whether `category` names this set of standards.
    pub fn has_category(&self, category: &str) -> bool {
        self.category == category
    }

    /// Standard for an exact antibiotic name.
    pub fn get(&self, antibiotic: &str) -> Option<&DosageStandard> {
        self.by_name.get(antibiotic).map(|&i| &self.standards[i])
    }

    pub fn standards(&self) -> &[DosageStandard] {
        &self.standards
    }

    pub fn len(&self) -> usize {
        self.standards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.standards.is_empty()
    }
}

/// Group rows by key, preserving first-appearance order of keys and rows.
fn group_by<'a, T, F>(rows: &'a [T], key: F) -> Vec<(String, Vec<&'a T>)>
where
    F: Fn(&'a T) -> &'a str,
{
    let mut groups: Vec<(String, Vec<&'a T>)> = Vec::new();
    let mut positions: HashMap<&'a str, usize> = HashMap::new();

    for row in rows {
        let k = key(row);
        match positions.get(k) {
            Some(&i) => groups[i].1.push(row),
            None => {
                positions.insert(k, groups.len());
                groups.push((k.to_string(), vec![row]));
            }
        }
    }
    groups
}

/// Floor of the mean course length.
fn mean_days(group: &[&ReferenceCase]) -> u32 {
    if group.is_empty() {
        return 0;
    }
    let total: u64 = group.iter().map(|c| u64::from(c.treatment_days)).sum();
    (total / group.len() as u64) as u32
}
