//! Reference dataset loading and the derived indexes.
//!
//! The dataset is a CSV table of historical poultry treatments. It is loaded
//! once, indexed once, and then shared read-only through [`ReferenceData`].

mod index;

pub use index::*;

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::ReferenceCase;

/// Category every dataset antibiotic is listed under.
pub const DEFAULT_CATEGORY: &str = "Poultry";

/// Dataset errors.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid row {line}: {reason}")]
    InvalidRow { line: usize, reason: String },
}

pub type DatasetResult<T> = Result<T, DatasetError>;

/// Raw CSV row, before validation.
#[derive(Debug, Deserialize)]
struct CaseRecord {
    #[serde(rename = "Disease")]
    disease: String,
    #[serde(rename = "Breed", default)]
    breed: Option<String>,
    #[serde(rename = "Age (days)")]
    age_days: f64,
    #[serde(rename = "Weight (kg)")]
    weight_kg: f64,
    #[serde(rename = "Suggested Antibiotic")]
    antibiotic: String,
    #[serde(rename = "Dosage of Antibiotic (mg)")]
    dosage_mg: f64,
    #[serde(rename = "Treatment Days")]
    treatment_days: f64,
}

impl CaseRecord {
    fn into_case(self, line: usize) -> DatasetResult<ReferenceCase> {
        let invalid = |reason: String| DatasetError::InvalidRow { line, reason };

        if self.disease.trim().is_empty() {
            return Err(invalid("empty disease".into()));
        }
        if self.antibiotic.trim().is_empty() {
            return Err(invalid("empty antibiotic".into()));
        }
        if !self.weight_kg.is_finite() || self.weight_kg <= 0.0 {
            return Err(invalid(format!("weight must be positive, got {}", self.weight_kg)));
        }
        if !self.age_days.is_finite() || self.age_days < 0.0 {
            return Err(invalid(format!("age must be non-negative, got {}", self.age_days)));
        }
        if !self.dosage_mg.is_finite() || self.dosage_mg < 0.0 {
            return Err(invalid(format!("dosage must be non-negative, got {}", self.dosage_mg)));
        }
        if !self.treatment_days.is_finite()
            || self.treatment_days < 1.0
            || self.treatment_days > f64::from(u32::MAX)
        {
            return Err(invalid(format!(
                "treatment days must be at least 1, got {}",
                self.treatment_days
            )));
        }

        Ok(ReferenceCase {
            disease: self.disease,
            breed: self.breed.filter(|b| !b.trim().is_empty()),
            age_days: self.age_days,
            weight_kg: self.weight_kg,
            antibiotic: self.antibiotic,
            dosage_mg: self.dosage_mg,
            treatment_days: self.treatment_days.trunc() as u32,
        })
    }
}

/// The loaded reference table, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    cases: Vec<ReferenceCase>,
    fingerprint: String,
}

impl Dataset {
    /// Load a dataset from a CSV file.
    pub fn load<P: AsRef<Path>>(path: P) -> DatasetResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Load a dataset from any reader.
    pub fn from_reader<R: Read>(mut reader: R) -> DatasetResult<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Parse CSV bytes. The header row names the columns.
    pub fn from_bytes(bytes: &[u8]) -> DatasetResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let mut cases = Vec::new();
        for (i, record) in reader.deserialize::<CaseRecord>().enumerate() {
            // Line 1 is the header
            cases.push(record?.into_case(i + 2)?);
        }

        Ok(Self {
            cases,
            fingerprint: fingerprint_bytes(bytes),
        })
    }

    /// Build a dataset from already-parsed cases.
    pub fn from_cases(cases: Vec<ReferenceCase>) -> Self {
        let mut hasher = Sha256::new();
        for case in &cases {
            hasher.update(
                format!(
                    "{}|{}|{}|{}|{}|{}|{}\n",
                    case.disease,
                    case.breed.as_deref().unwrap_or(""),
                    case.age_days,
                    case.weight_kg,
                    case.antibiotic,
                    case.dosage_mg,
                    case.treatment_days
                )
                .as_bytes(),
            );
        }
        Self {
            cases,
            fingerprint: hex::encode(hasher.finalize()),
        }
    }

    /// A dataset with no rows.
    pub fn empty() -> Self {
        Self::from_cases(Vec::new())
    }

    pub fn cases(&self) -> &[ReferenceCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// SHA-256 (hex) of the source bytes.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Distinct disease names, sorted.
    pub fn diseases(&self) -> Vec<String> {
        self.cases
            .iter()
            .map(|c| c.disease.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct antibiotic names in first-appearance order.
    pub fn antibiotics(&self) -> Vec<String> {
        let mut seen = Vec::<String>::new();
        for case in &self.cases {
            if !seen.contains(&case.antibiotic) {
                seen.push(case.antibiotic.clone());
            }
        }
        seen
    }
}

fn fingerprint_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Dataset plus derived indexes, immutable once built.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    dataset: Dataset,
    diseases: DiseaseIndex,
    standards: DosageStandards,
    loaded: bool,
}

impl ReferenceData {
    /// Index a dataset.
    pub fn build(dataset: Dataset, category: &str) -> Self {
        let diseases = DiseaseIndex::build(dataset.cases(), category);
        let standards = DosageStandards::build(dataset.cases(), category);
        Self {
            dataset,
            diseases,
            standards,
            loaded: true,
        }
    }

    /// Load and index a dataset file.
    pub fn load<P: AsRef<Path>>(path: P, category: &str) -> DatasetResult<Self> {
        let dataset = Dataset::load(path.as_ref())?;
        let data = Self::build(dataset, category);
        info!(
            path = %path.as_ref().display(),
            cases = data.dataset.len(),
            diseases = data.diseases.len(),
            antibiotics = data.standards.len(),
            fingerprint = %data.dataset.fingerprint(),
            "Reference dataset loaded"
        );
        Ok(data)
    }

    /// Load a dataset file, degrading to "no data" when it cannot be read.
    pub fn load_or_empty<P: AsRef<Path>>(path: P, category: &str) -> Self {
        match Self::load(path.as_ref(), category) {
            Ok(data) => data,
            Err(e) => {
                warn!(
                    path = %path.as_ref().display(),
                    error = %e,
                    "Reference dataset unavailable, recommendations will use fallback dosing"
                );
                Self::unavailable(category)
            }
        }
    }

    /// Empty reference state for when no dataset could be loaded.
    pub fn unavailable(category: &str) -> Self {
        let mut data = Self::build(Dataset::empty(), category);
        data.loaded = false;
        data
    }

    /// Whether a dataset was successfully loaded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn cases(&self) -> &[ReferenceCase] {
        self.dataset.cases()
    }

    pub fn disease_index(&self) -> &DiseaseIndex {
        &self.diseases
    }

    pub fn dosage_standards(&self) -> &DosageStandards {
        &self.standards
    }

    /// Fingerprint of the loaded dataset, if any.
    pub fn fingerprint(&self) -> Option<&str> {
        self.loaded.then(|| self.dataset.fingerprint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CSV: &str = "\
Disease,Breed,Age (days),Weight (kg),Suggested Antibiotic,Dosage of Antibiotic (mg),Treatment Days
Coccidiosis,Broiler,10,0.5,Amprolium,50,5
Coccidiosis,,20,1.0,Sulfadimethoxine,80,7
Newcastle,Layer,30,1.5,Doxycycline,120,6
";

    #[test]
    fn test_parse_csv() {
        let dataset = Dataset::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(dataset.len(), 3);

        let first = &dataset.cases()[0];
        assert_eq!(first.disease, "Coccidiosis");
        assert_eq!(first.breed.as_deref(), Some("Broiler"));
        assert_eq!(first.age_days, 10.0);
        assert_eq!(first.weight_kg, 0.5);
        assert_eq!(first.antibiotic, "Amprolium");
        assert_eq!(first.dosage_mg, 50.0);
        assert_eq!(first.treatment_days, 5);

        // Empty breed becomes None
        assert_eq!(dataset.cases()[1].breed, None);
    }

    #[test]
    fn test_distinct_diseases_and_antibiotics() {
        let dataset = Dataset::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(dataset.diseases(), vec!["Coccidiosis", "Newcastle"]);
        assert_eq!(
            dataset.antibiotics(),
            vec!["Amprolium", "Sulfadimethoxine", "Doxycycline"]
        );
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = Dataset::from_reader(CSV.as_bytes()).unwrap();
        let b = Dataset::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let changed = CSV.replace("Amprolium,50", "Amprolium,55");
        let c = Dataset::from_reader(changed.as_bytes()).unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_fractional_days_truncate() {
        let csv = "\
Disease,Breed,Age (days),Weight (kg),Suggested Antibiotic,Dosage of Antibiotic (mg),Treatment Days
Coccidiosis,Broiler,10,0.5,Amprolium,50,5.0
";
        let dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(dataset.cases()[0].treatment_days, 5);
    }

    #[test]
    fn test_zero_weight_rejected() {
        let csv = "\
Disease,Breed,Age (days),Weight (kg),Suggested Antibiotic,Dosage of Antibiotic (mg),Treatment Days
Coccidiosis,Broiler,10,0,Amprolium,50,5
";
        let result = Dataset::from_reader(csv.as_bytes());
        assert!(matches!(result, Err(DatasetError::InvalidRow { line: 2, .. })));
    }

    #[test]
    fn test_non_numeric_column_rejected() {
        let csv = "\
Disease,Breed,Age (days),Weight (kg),Suggested Antibiotic,Dosage of Antibiotic (mg),Treatment Days
Coccidiosis,Broiler,ten,0.5,Amprolium,50,5
";
        assert!(matches!(
            Dataset::from_reader(csv.as_bytes()),
            Err(DatasetError::Csv(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();

        let data = ReferenceData::load(file.path(), DEFAULT_CATEGORY).unwrap();
        assert!(data.is_loaded());
        assert_eq!(data.cases().len(), 3);
        assert_eq!(data.disease_index().len(), 2);
        assert!(data.fingerprint().is_some());
    }

    #[test]
    fn test_missing_file_degrades() {
        let data = ReferenceData::load_or_empty("/nonexistent/poultry.csv", DEFAULT_CATEGORY);
        assert!(!data.is_loaded());
        assert!(data.cases().is_empty());
        assert!(data.disease_index().is_empty());
        assert!(data.dosage_standards().is_empty());
        assert_eq!(data.fingerprint(), None);
    }
}
