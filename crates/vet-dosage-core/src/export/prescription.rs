//! Prescription export of saved recommendations.

use serde::{Deserialize, Serialize};

use crate::db::{Database, DbError, DbResult};
use crate::models::Recommendation;

const CSV_HEADER: &str = "recommendation_id,farmer_mobile,disease,animal_type,weight_kg,age_days,\
antibiotic,single_dose_ml,daily_frequency,treatment_days,start_date,end_date,\
total_treatment_dosage_ml,schedule,source,notes\n";

/// Prescription export for a single recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionExport {
    pub metadata: PrescriptionMetadata,
    /// One line per antibiotic, in plan order
    pub lines: Vec<PrescriptionLine>,
}

/// Prescription export metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionMetadata {
    pub recommendation_id: String,
    pub farmer_id: String,
    /// Mobile number the prescription is sent to
    pub farmer_mobile: Option<String>,
    pub doctor_id: String,
    pub disease: String,
    pub animal_type: String,
    pub weight_kg: f64,
    pub age_days: u32,
    /// Reference data fingerprint for traceability
    pub dataset_fingerprint: Option<String>,
    pub created_at: String,
    /// Export timestamp
    pub exported_at: String,
}

/// Single antibiotic line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionLine {
    pub antibiotic: String,
    pub single_dose_ml: f64,
    pub daily_frequency: u32,
    pub treatment_days: u32,
    pub start_date: String,
    pub end_date: String,
    pub total_treatment_dosage_ml: f64,
    /// e.g. "Twice daily for 5 days"
    pub schedule: String,
    pub source: String,
    pub notes: Option<String>,
}

impl PrescriptionExport {
    /// Build an export from a saved recommendation.
    pub fn from_recommendation(rec: &Recommendation, farmer_mobile: Option<&str>) -> Self {
        let lines = rec
            .items
            .iter()
            .map(|item| PrescriptionLine {
                antibiotic: item.plan.antibiotic.clone(),
                single_dose_ml: item.plan.single_dose_ml,
                daily_frequency: item.plan.daily_frequency,
                treatment_days: item.plan.treatment_days,
                start_date: item.plan.start_date.to_string(),
                end_date: item.plan.end_date.to_string(),
                total_treatment_dosage_ml: item.plan.total_treatment_dosage_ml,
                schedule: item.plan.frequency_description.clone(),
                source: item.plan.source.to_string(),
                notes: item.notes.clone(),
            })
            .collect();

        Self {
            metadata: PrescriptionMetadata {
                recommendation_id: rec.id.clone(),
                farmer_id: rec.farmer_id.clone(),
                farmer_mobile: farmer_mobile.map(str::to_string),
                doctor_id: rec.doctor_id.clone(),
                disease: rec.disease.clone(),
                animal_type: rec.animal_type.clone(),
                weight_kg: rec.weight_kg,
                age_days: rec.age_days,
                dataset_fingerprint: rec.dataset_fingerprint.clone(),
                created_at: rec.created_at.clone(),
                exported_at: chrono::Utc::now().to_rfc3339(),
            },
            lines,
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(CSV_HEADER);
        self.push_csv_lines(&mut csv);
        csv
    }

    fn push_csv_lines(&self, csv: &mut String) {
        let meta = &self.metadata;
        for line in &self.lines {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}\n",
                escape_csv(&meta.recommendation_id),
                escape_csv(meta.farmer_mobile.as_deref().unwrap_or("")),
                escape_csv(&meta.disease),
                escape_csv(&meta.animal_type),
                meta.weight_kg,
                meta.age_days,
                escape_csv(&line.antibiotic),
                line.single_dose_ml,
                line.daily_frequency,
                line.treatment_days,
                line.start_date,
                line.end_date,
                line.total_treatment_dosage_ml,
                escape_csv(&line.schedule),
                line.source,
                escape_csv(line.notes.as_deref().unwrap_or("")),
            ));
        }
    }
}

/// All recommendations for one farmer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmerPrescriptionExport {
    pub exported_at: String,
    pub prescriptions: Vec<PrescriptionExport>,
    /// Total antibiotic line count
    pub total_lines: usize,
}

impl FarmerPrescriptionExport {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(CSV_HEADER);
        for export in &self.prescriptions {
            export.push_csv_lines(&mut csv);
        }
        csv
    }
}

/// Loads saved recommendations and builds exports.
pub struct PrescriptionExporter<'a> {
    db: &'a Database,
}

impl<'a> PrescriptionExporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Export one recommendation by ID.
    pub fn export_by_id(&self, recommendation_id: &str) -> DbResult<PrescriptionExport> {
        let rec = self
            .db
            .get_recommendation(recommendation_id)?
            .ok_or_else(|| DbError::NotFound(format!("recommendation {}", recommendation_id)))?;
        let mobile = self.db.get_farmer(&rec.farmer_id)?.map(|f| f.mobile_no);
        Ok(PrescriptionExport::from_recommendation(&rec, mobile.as_deref()))
    }

    /// Export every recommendation for a farmer, newest first.
    pub fn export_for_farmer(&self, farmer_id: &str) -> DbResult<FarmerPrescriptionExport> {
        let farmer = self
            .db
            .get_farmer(farmer_id)?
            .ok_or_else(|| DbError::NotFound(format!("farmer {}", farmer_id)))?;

        let prescriptions: Vec<PrescriptionExport> = self
            .db
            .list_recommendations_for_farmer(farmer_id)?
            .iter()
            .map(|rec| PrescriptionExport::from_recommendation(rec, Some(&farmer.mobile_no)))
            .collect();
        let total_lines = prescriptions.iter().map(|p| p.lines.len()).sum();

        Ok(FarmerPrescriptionExport {
            exported_at: chrono::Utc::now().to_rfc3339(),
            prescriptions,
            total_lines,
        })
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
