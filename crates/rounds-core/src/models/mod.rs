pub mod assessment;
pub mod case;
pub mod phase;
pub mod transcript;
pub mod usage;
