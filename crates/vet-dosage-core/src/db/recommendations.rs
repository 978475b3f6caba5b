//! Recommendation header and item database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, ToSql};
use tracing::{debug, info};

use super::{constraint_or, Database, DbError, DbResult};
use crate::models::{PlanSource, Recommendation, RecommendationItem, TreatmentPlan};

const DATE_FORMAT: &str = "%Y-%m-%d";

const HEADER_COLUMNS: &str = r#"
    id, farmer_id, doctor_id, disease, animal_type, weight_kg, age_days,
    is_claimed, claimed_by, dataset_fingerprint, notes, created_at, updated_at
"#;

impl Database {
    /// Insert a recommendation header and all of its items.
    ///
    /// Runs in one transaction: if any item is rejected nothing is stored.
    pub fn insert_recommendation(&self, rec: &Recommendation) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            r#"
            INSERT INTO medicine_recommendations (
                id, farmer_id, doctor_id, disease, animal_type, weight_kg, age_days,
                is_claimed, claimed_by, dataset_fingerprint, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                rec.id,
                rec.farmer_id,
                rec.doctor_id,
                rec.disease,
                rec.animal_type,
                rec.weight_kg,
                rec.age_days,
                rec.is_claimed,
                rec.claimed_by,
                rec.dataset_fingerprint,
                rec.notes,
                rec.created_at,
                rec.updated_at,
            ],
        )
        .map_err(constraint_or)?;

        for item in &rec.items {
            let plan = &item.plan;
            tx.execute(
                r#"
                INSERT INTO recommendation_items (
                    id, recommendation_id, position, antibiotic, single_dose_ml,
                    daily_frequency, treatment_days, start_date, end_date,
                    total_daily_dosage_ml, total_treatment_dosage_ml,
                    frequency_description, source, notes
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
                params![
                    item.id,
                    rec.id,
                    item.position,
                    plan.antibiotic,
                    plan.single_dose_ml,
                    plan.daily_frequency,
                    plan.treatment_days,
                    plan.start_date.format(DATE_FORMAT).to_string(),
                    plan.end_date.format(DATE_FORMAT).to_string(),
                    plan.total_daily_dosage_ml,
                    plan.total_treatment_dosage_ml,
                    plan.frequency_description,
                    plan.source.as_str(),
                    item.notes,
                ],
            )
            .map_err(constraint_or)?;
        }

        tx.commit()?;
        info!(
            recommendation_id = %rec.id,
            farmer_id = %rec.farmer_id,
            items = rec.items.len(),
            "Recommendation saved"
        );
        Ok(())
    }

    /// Get a recommendation with its items.
    pub fn get_recommendation(&self, id: &str) -> DbResult<Option<Recommendation>> {
        let header = self
            .conn
            .query_row(
                &format!("SELECT {} FROM medicine_recommendations WHERE id = ?", HEADER_COLUMNS),
                [id],
                header_from_row,
            )
            .optional()?;

        match header {
            Some(row) => {
                let items = self.load_items(&row.id)?;
                Ok(Some(row.into_recommendation(items)))
            }
            None => Ok(None),
        }
    }

    /// Recommendations written for a farmer, newest first.
    pub fn list_recommendations_for_farmer(&self, farmer_id: &str) -> DbResult<Vec<Recommendation>> {
        self.load_recommendations("WHERE farmer_id = ?1", &[&farmer_id])
    }

    /// Recommendations written by a doctor, newest first.
    pub fn list_recommendations_for_doctor(&self, doctor_id: &str) -> DbResult<Vec<Recommendation>> {
        self.load_recommendations("WHERE doctor_id = ?1", &[&doctor_id])
    }

    /// Recommendations not yet dispensed, newest first.
    pub fn list_unclaimed_recommendations(&self) -> DbResult<Vec<Recommendation>> {
        self.load_recommendations("WHERE is_claimed = 0", &[])
    }

    /// Mark a recommendation as dispensed.
    ///
    /// Fails with `NotFound` for an unknown ID and `Constraint` when it is
    /// already claimed.
    pub fn claim_recommendation(&self, id: &str, claimed_by: &str) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE medicine_recommendations SET
                is_claimed = 1,
                claimed_by = ?2,
                updated_at = datetime('now')
            WHERE id = ?1 AND is_claimed = 0
            "#,
            params![id, claimed_by],
        )?;

        if rows_affected == 0 {
            return match self.recommendation_exists(id)? {
                true => Err(DbError::Constraint(format!("Recommendation already claimed: {}", id))),
                false => Err(DbError::NotFound(format!("recommendation {}", id))),
            };
        }
        debug!(recommendation_id = %id, claimed_by, "Recommendation claimed");
        Ok(())
    }

    /// Return a claimed recommendation to the unclaimed pool.
    pub fn unclaim_recommendation(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE medicine_recommendations SET
                is_claimed = 0,
                claimed_by = NULL,
                updated_at = datetime('now')
            WHERE id = ?1 AND is_claimed = 1
            "#,
            [id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Delete a recommendation. Items are removed by cascade.
    pub fn delete_recommendation(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM medicine_recommendations WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    fn recommendation_exists(&self, id: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM medicine_recommendations WHERE id = ?",
            [id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn load_recommendations(&self, filter: &str, args: &[&dyn ToSql]) -> DbResult<Vec<Recommendation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM medicine_recommendations {} ORDER BY created_at DESC, rowid DESC",
            HEADER_COLUMNS, filter
        ))?;

        let headers = stmt
            .query_map(args, header_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut recommendations = Vec::with_capacity(headers.len());
        for header in headers {
            let items = self.load_items(&header.id)?;
            recommendations.push(header.into_recommendation(items));
        }
        Ok(recommendations)
    }

    fn load_items(&self, recommendation_id: &str) -> DbResult<Vec<RecommendationItem>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, position, antibiotic, single_dose_ml, daily_frequency,
                   treatment_days, start_date, end_date, total_daily_dosage_ml,
                   total_treatment_dosage_ml, frequency_description, source, notes
            FROM recommendation_items
            WHERE recommendation_id = ?
            ORDER BY position
            "#,
        )?;

        let rows = stmt.query_map([recommendation_id], |row| {
            Ok(ItemRow {
                id: row.get(0)?,
                position: row.get(1)?,
                antibiotic: row.get(2)?,
                single_dose_ml: row.get(3)?,
                daily_frequency: row.get(4)?,
                treatment_days: row.get(5)?,
                start_date: row.get(6)?,
                end_date: row.get(7)?,
                total_daily_dosage_ml: row.get(8)?,
                total_treatment_dosage_ml: row.get(9)?,
                frequency_description: row.get(10)?,
                source: row.get(11)?,
                notes: row.get(12)?,
            })
        })?;

        let mut items: Vec<RecommendationItem> = Vec::new();
        for row in rows {
            items.push(row?.try_into()?);
        }
        Ok(items)
    }
}

/// Intermediate header row for database mapping.
struct HeaderRow {
    id: String,
    farmer_id: String,
    doctor_id: String,
    disease: String,
    animal_type: String,
    weight_kg: f64,
    age_days: u32,
    is_claimed: bool,
    claimed_by: Option<String>,
    dataset_fingerprint: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

fn header_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HeaderRow> {
    Ok(HeaderRow {
        id: row.get(0)?,
        farmer_id: row.get(1)?,
        doctor_id: row.get(2)?,
        disease: row.get(3)?,
        animal_type: row.get(4)?,
        weight_kg: row.get(5)?,
        age_days: row.get(6)?,
        is_claimed: row.get(7)?,
        claimed_by: row.get(8)?,
        dataset_fingerprint: row.get(9)?,
        notes: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

impl HeaderRow {
    fn into_recommendation(self, items: Vec<RecommendationItem>) -> Recommendation {
        Recommendation {
            id: self.id,
            farmer_id: self.farmer_id,
            doctor_id: self.doctor_id,
            disease: self.disease,
            animal_type: self.animal_type,
            weight_kg: self.weight_kg,
            age_days: self.age_days,
            is_claimed: self.is_claimed,
            claimed_by: self.claimed_by,
            dataset_fingerprint: self.dataset_fingerprint,
            notes: self.notes,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Intermediate item row for database mapping.
struct ItemRow {
    id: String,
    position: u32,
    antibiotic: String,
    single_dose_ml: f64,
    daily_frequency: u32,
    treatment_days: u32,
    start_date: String,
    end_date: String,
    total_daily_dosage_ml: f64,
    total_treatment_dosage_ml: f64,
    frequency_description: String,
    source: String,
    notes: Option<String>,
}

impl TryFrom<ItemRow> for RecommendationItem {
    type Error = DbError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let source = PlanSource::parse(&row.source)
            .ok_or_else(|| DbError::Constraint(format!("Unknown plan source: {}", row.source)))?;

        Ok(RecommendationItem {
            id: row.id,
            position: row.position,
            plan: TreatmentPlan {
                antibiotic: row.antibiotic,
                single_dose_ml: row.single_dose_ml,
                daily_frequency: row.daily_frequency,
                treatment_days: row.treatment_days,
                start_date: parse_date(&row.start_date)?,
                end_date: parse_date(&row.end_date)?,
                total_daily_dosage_ml: row.total_daily_dosage_ml,
                total_treatment_dosage_ml: row.total_treatment_dosage_ml,
                frequency_description: row.frequency_description,
                source,
            },
            notes: row.notes,
        })
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| DbError::Constraint(format!("Invalid date {:?}: {}", s, e)))
}
