//! Dose unit conversion and rounding.

/// Assumed liquid concentration: 10 mg of antibiotic per mL.
pub const MG_PER_ML: f64 = 10.0;

/// Convert a dose in mg to mL at [`MG_PER_ML`].
pub fn mg_to_ml(mg: f64) -> f64 {
    mg / MG_PER_ML
}

/// Round to a fixed number of decimal places, ties to even.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}

/// Clamp into `[min, max]`.
pub fn clamp_dose(value: f64, (min, max): (f64, f64)) -> f64 {
    value.max(min).min(max)
}
