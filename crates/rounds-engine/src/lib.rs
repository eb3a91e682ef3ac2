//! rounds-engine
//!
//! Phase progression and coverage tracking for a case-based tutoring
//! dialogue. A [`session::Session`] owns the loaded case, the transcript,
//! the learner's differential, and the per-phase caches; every judgment it
//! needs goes through a borrowed [`rounds_bedrock::Judge`].

pub mod compare;
pub mod coverage;
pub mod differential;
pub mod error;
pub mod persistence;
pub mod phase;
pub mod prompt;
pub mod session;
pub mod summary;
pub mod topic;

pub use crate::error::EngineError;
pub use crate::session::Session;
