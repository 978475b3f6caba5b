//! Input validation errors.

use thiserror::Error;

/// Longest course the planner will schedule, in days.
pub const MAX_TREATMENT_DAYS: u32 = 365;

/// Malformed request input, rejected before any computation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid number for {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Age must be greater than zero")]
    NonPositiveAge,

    #[error("Weight must be a positive number, got {0}")]
    NonPositiveWeight(f64),

    #[error("top_n must be at least 1")]
    ZeroTopN,

    #[error("Daily frequency must be at least 1")]
    ZeroFrequency,

    #[error("Treatment days must be between 1 and 365, got {0}")]
    TreatmentDaysOutOfRange(u32),

    #[error("Single dose must be a positive number of mL, got {0}")]
    NonPositiveDose(f64),

    #[error("At least one antibiotic treatment must be provided")]
    NoAntibiotics,

    #[error("Mobile number must be exactly 10 digits: {0:?}")]
    InvalidMobile(String),
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Parse an age in days from request text.
pub fn parse_age_days(raw: &str) -> ValidationResult<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField("age"));
    }
    let age: i64 = trimmed.parse().map_err(|_| ValidationError::InvalidNumber {
        field: "age",
        value: raw.to_string(),
    })?;
    if age <= 0 {
        return Err(ValidationError::NonPositiveAge);
    }
    u32::try_from(age).map_err(|_| ValidationError::InvalidNumber {
        field: "age",
        value: raw.to_string(),
    })
}

/// Parse a weight in kg from request text.
pub fn parse_weight_kg(raw: &str) -> ValidationResult<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField("weight"));
    }
    let weight: f64 = trimmed.parse().map_err(|_| ValidationError::InvalidNumber {
        field: "weight",
        value: raw.to_string(),
    })?;
    check_weight(weight)?;
    Ok(weight)
}

/// Weight must be finite and strictly positive.
pub fn check_weight(weight_kg: f64) -> ValidationResult<()> {
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        return Err(ValidationError::NonPositiveWeight(weight_kg));
    }
    Ok(())
}

/// Require a non-blank text field.
pub fn require_text(value: &str, field: &'static str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

/// Mobile numbers are 10 ASCII digits.
pub fn check_mobile(mobile_no: &str) -> ValidationResult<()> {
    if mobile_no.len() != 10 || !mobile_no.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidMobile(mobile_no.to_string()));
    }
    Ok(())
}
