//! Domain models for the vet-dosage system.

mod farmer;
mod recommendation;
mod reference;
mod treatment;
mod validation;

pub use farmer::*;
pub use recommendation::*;
pub use reference::*;
pub use treatment::*;
pub use validation::*;
