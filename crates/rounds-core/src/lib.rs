//! rounds-core
//!
//! Pure domain types for the case tutor: phases, clinical elements, cases,
//! transcripts, judgment results, and the loaders that turn case and prompt
//! files into them. No AWS SDK dependency.

pub mod error;
pub mod loader;
pub mod models;
