//! Dosage planning: turns a matched or fallback choice into a schedule.
//!
//! Decision order for each antibiotic:
//! 1. explicit days + dose supplied by the caller, used verbatim (no clamping);
//! 2. nearest reference case, dose = dosage_mg / 10 clamped to [1, 15] mL;
//! 3. fallback, dose = 0.5 mL/kg clamped to [1, 10] mL.

use chrono::{Days, NaiveDate};

use crate::models::{
    AntibioticRequest, PlanSource, TreatmentMatch, TreatmentPlan, TreatmentQuery, ValidationError,
    ValidationResult, MAX_TREATMENT_DAYS,
};
use crate::units::{clamp_dose, mg_to_ml, round_to};

/// Conservative weight-proportional dose used without reference data.
pub const FALLBACK_ML_PER_KG: f64 = 0.5;

/// Course length used by the fallback when the caller gives none.
pub const DEFAULT_FALLBACK_TREATMENT_DAYS: u32 = 7;

/// Builds treatment plans. Holds no state besides its defaults.
#[derive(Debug, Clone)]
pub struct DosagePlanner {
    fallback_treatment_days: u32,
}

impl Default for DosagePlanner {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_TREATMENT_DAYS)
    }
}

impl DosagePlanner {
    pub fn new(fallback_treatment_days: u32) -> Self {
        Self {
            fallback_treatment_days,
        }
    }

    /// Plan one antibiotic for the animal described by `query`.
    ///
    /// `best_match` is the single nearest reference case for the animal, if
    /// any. `start_date` is the caller's "today".
    pub fn plan(
        &self,
        query: &TreatmentQuery,
        request: &AntibioticRequest,
        best_match: Option<&TreatmentMatch>,
        start_date: NaiveDate,
    ) -> ValidationResult<TreatmentPlan> {
        query.validate()?;
        if request.antibiotic.trim().is_empty() {
            return Err(ValidationError::MissingField("antibiotic"));
        }
        if request.daily_frequency == 0 {
            return Err(ValidationError::ZeroFrequency);
        }

        let (treatment_days, single_dose_ml, source) = match (request.explicit_values(), best_match) {
            (Some((days, dose)), _) => {
                check_explicit_dose(dose)?;
                check_caller_days(days)?;
                (days, dose, request.source.unwrap_or(PlanSource::Fallback))
            }
            (None, Some(m)) => {
                let dose = clamp_dose(round_to(mg_to_ml(m.dosage_mg), 1), PlanSource::Ai.dose_bounds());
                (m.treatment_days, dose, PlanSource::Ai)
            }
            (None, None) => {
                let days = match request.treatment_days.filter(|d| *d > 0) {
                    Some(days) => check_caller_days(days)?,
                    None => self.fallback_treatment_days,
                };
                let dose = clamp_dose(
                    round_to(query.weight_kg * FALLBACK_ML_PER_KG, 1),
                    PlanSource::Fallback.dose_bounds(),
                );
                (days, dose, PlanSource::Fallback)
            }
        };

        // Reference courses are taken as recorded; only date overflow is fatal
        let end_date = start_date
            .checked_add_days(Days::new(u64::from(treatment_days)))
            .ok_or(ValidationError::TreatmentDaysOutOfRange(treatment_days))?;

        let total_daily_dosage_ml = single_dose_ml * f64::from(request.daily_frequency);
        let total_treatment_dosage_ml = total_daily_dosage_ml * f64::from(treatment_days);

        Ok(TreatmentPlan {
            antibiotic: request.antibiotic.clone(),
            single_dose_ml,
            daily_frequency: request.daily_frequency,
            treatment_days,
            start_date,
            end_date,
            total_daily_dosage_ml,
            total_treatment_dosage_ml,
            frequency_description: frequency_description(request.daily_frequency, treatment_days),
            source,
        })
    }
}

/// Explicit doses are not clamped, only sanity-checked.
fn check_explicit_dose(dose: f64) -> ValidationResult<()> {
    if !dose.is_finite() || dose <= 0.0 {
        return Err(ValidationError::NonPositiveDose(dose));
    }
    Ok(())
}

fn check_caller_days(days: u32) -> ValidationResult<u32> {
    if days == 0 || days > MAX_TREATMENT_DAYS {
        return Err(ValidationError::TreatmentDaysOutOfRange(days));
    }
    Ok(days)
}

/// "Twice daily for 5 days" style schedule text.
pub fn frequency_description(daily_frequency: u32, treatment_days: u32) -> String {
    let frequency = match daily_frequency {
        1 => "Once daily".to_string(),
        2 => "Twice daily".to_string(),
        3 => "Three times daily".to_string(),
        n => format!("{} times daily", n),
    };
    format!("{} for {} days", frequency, treatment_days)
}
