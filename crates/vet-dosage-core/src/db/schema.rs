//! SQLite schema definition.

/// Complete database schema for vet-dosage.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Farmers
-- ============================================================================

CREATE TABLE IF NOT EXISTS farmers (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    mobile_no TEXT NOT NULL UNIQUE,
    area TEXT,
    pincode TEXT,
    doctor_id TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_farmers_doctor ON farmers(doctor_id);

-- ============================================================================
-- Medicine Recommendations (header, one per animal)
-- ============================================================================

CREATE TABLE IF NOT EXISTS medicine_recommendations (
    id TEXT PRIMARY KEY,
    farmer_id TEXT NOT NULL REFERENCES farmers(id) ON DELETE CASCADE,
    doctor_id TEXT NOT NULL,
    disease TEXT NOT NULL,
    animal_type TEXT NOT NULL,
    weight_kg REAL NOT NULL CHECK (weight_kg > 0),
    age_days INTEGER NOT NULL CHECK (age_days > 0),
    is_claimed INTEGER NOT NULL DEFAULT 0,
    claimed_by TEXT,
    dataset_fingerprint TEXT,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_recommendations_farmer ON medicine_recommendations(farmer_id);
CREATE INDEX IF NOT EXISTS idx_recommendations_doctor ON medicine_recommendations(doctor_id);
CREATE INDEX IF NOT EXISTS idx_recommendations_claimed ON medicine_recommendations(is_claimed);

-- ============================================================================
-- Recommendation Items (one per antibiotic)
-- ============================================================================

CREATE TABLE IF NOT EXISTS recommendation_items (
    id TEXT PRIMARY KEY,
    recommendation_id TEXT NOT NULL REFERENCES medicine_recommendations(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    antibiotic TEXT NOT NULL,
    single_dose_ml REAL NOT NULL CHECK (single_dose_ml > 0),
    daily_frequency INTEGER NOT NULL CHECK (daily_frequency >= 1),
    treatment_days INTEGER NOT NULL CHECK (treatment_days >= 1),
    start_date TEXT NOT NULL,                    -- YYYY-MM-DD
    end_date TEXT NOT NULL,                      -- YYYY-MM-DD
    total_daily_dosage_ml REAL NOT NULL,
    total_treatment_dosage_ml REAL NOT NULL,
    frequency_description TEXT NOT NULL,
    source TEXT NOT NULL CHECK (source IN ('AI', 'Fallback')),
    notes TEXT,
    UNIQUE (recommendation_id, position)
);

CREATE INDEX IF NOT EXISTS idx_items_recommendation ON recommendation_items(recommendation_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO farmers (id, name, mobile_no) VALUES ('f1', 'Ravi', '9876543210')",
            [],
        )
        .unwrap();
        conn.execute(
            r#"INSERT INTO medicine_recommendations
               (id, farmer_id, doctor_id, disease, animal_type, weight_kg, age_days)
               VALUES ('r1', 'f1', 'd1', 'Coccidiosis', 'Broiler', 0.6, 12)"#,
            [],
        )
        .unwrap();
        conn
    }

    fn insert_item(conn: &Connection, id: &str, dose: f64, frequency: i64, days: i64) -> rusqlite::Result<usize> {
        conn.execute(
            r#"INSERT INTO recommendation_items
               (id, recommendation_id, position, antibiotic, single_dose_ml, daily_frequency,
                treatment_days, start_date, end_date, total_daily_dosage_ml,
                total_treatment_dosage_ml, frequency_description, source)
               VALUES (?1, 'r1', (SELECT COUNT(*) FROM recommendation_items), 'Amprolium', ?2, ?3,
                       ?4, '2024-03-01', '2024-03-06', 6.0, 30.0, 'Twice daily for 5 days', 'AI')"#,
            rusqlite::params![id, dose, frequency, days],
        )
    }

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_item_check_constraints() {
        let conn = setup();

        assert!(insert_item(&conn, "i1", 3.0, 2, 5).is_ok());
        // Zero frequency
        assert!(insert_item(&conn, "i2", 3.0, 0, 5).is_err());
        // Zero days
        assert!(insert_item(&conn, "i3", 3.0, 2, 0).is_err());
        // Non-positive dose
        assert!(insert_item(&conn, "i4", 0.0, 2, 5).is_err());
    }

    #[test]
    fn test_unique_mobile() {
        let conn = setup();
        let result = conn.execute(
            "INSERT INTO farmers (id, name, mobile_no) VALUES ('f2', 'Sita', '9876543210')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_foreign_keys_and_cascade() {
        let conn = setup();

        // Unknown farmer
        let result = conn.execute(
            r#"INSERT INTO medicine_recommendations
               (id, farmer_id, doctor_id, disease, animal_type, weight_kg, age_days)
               VALUES ('r2', 'missing', 'd1', 'Coccidiosis', 'Broiler', 0.6, 12)"#,
            [],
        );
        assert!(result.is_err());

        insert_item(&conn, "i1", 3.0, 2, 5).unwrap();
        conn.execute("DELETE FROM medicine_recommendations WHERE id = 'r1'", [])
            .unwrap();

        let items: i64 = conn
            .query_row("SELECT COUNT(*) FROM recommendation_items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(items, 0);
    }
}
