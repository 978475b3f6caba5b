//! Farmer database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{constraint_or, Database, DbResult};
use crate::models::Farmer;

const FARMER_COLUMNS: &str =
    "id, name, mobile_no, area, pincode, doctor_id, created_at, updated_at";

fn farmer_from_row(row: &Row<'_>) -> rusqlite::Result<Farmer> {
    Ok(Farmer {
        id: row.get(0)?,
        name: row.get(1)?,
        mobile_no: row.get(2)?,
        area: row.get(3)?,
        pincode: row.get(4)?,
        doctor_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl Database {
    /// Insert a new farmer. A duplicate mobile number is a constraint error.
    pub fn insert_farmer(&self, farmer: &Farmer) -> DbResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO farmers (
                    id, name, mobile_no, area, pincode, doctor_id, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    farmer.id,
                    farmer.name,
                    farmer.mobile_no,
                    farmer.area,
                    farmer.pincode,
                    farmer.doctor_id,
                    farmer.created_at,
                    farmer.updated_at,
                ],
            )
            .map_err(constraint_or)?;
        Ok(())
    }

    /// Get a farmer by ID.
    pub fn get_farmer(&self, id: &str) -> DbResult<Option<Farmer>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM farmers WHERE id = ?", FARMER_COLUMNS),
                [id],
                farmer_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a farmer by mobile number.
    pub fn get_farmer_by_mobile(&self, mobile_no: &str) -> DbResult<Option<Farmer>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM farmers WHERE mobile_no = ?", FARMER_COLUMNS),
                [mobile_no],
                farmer_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List farmers registered by a doctor, by name.
    pub fn list_farmers_for_doctor(&self, doctor_id: &str) -> DbResult<Vec<Farmer>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM farmers WHERE doctor_id = ? ORDER BY name",
            FARMER_COLUMNS
        ))?;

        let rows = stmt.query_map([doctor_id], farmer_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
