//! Farmer (customer) models.

use serde::{Deserialize, Serialize};

use super::validation::{check_mobile, require_text, ValidationResult};

/// A farmer whose flock receives recommendations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Farmer {
    /// Local UUID
    pub id: String,
    /// Farmer name
    pub name: String,
    /// 10-digit mobile number, unique across farmers
    pub mobile_no: String,
    /// Village / area
    pub area: Option<String>,
    pub pincode: Option<String>,
    /// Doctor who registered the farmer
    pub doctor_id: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Farmer {
    /// Create a new farmer with required fields.
    pub fn new(name: String, mobile_no: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            mobile_no,
            area: None,
            pincode: None,
            doctor_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Name must be present and the mobile number must be 10 digits.
    pub fn validate(&self) -> ValidationResult<()> {
        require_text(&self.name, "name")?;
        check_mobile(&self.mobile_no)
    }
}
