//! Medications domain module: medicine stock and flock treatments.

pub mod medicine;
pub mod treatment;

pub use medicine::{Medicine, MedicineDiscard, MedicineEntry, availability, medicines_by_suitability};
pub use treatment::{MedicineApplication, Treatment};
