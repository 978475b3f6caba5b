//! Export of saved recommendations as prescriptions.

mod prescription;

pub use prescription::*;
