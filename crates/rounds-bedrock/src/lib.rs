//! rounds-bedrock
//!
//! The external judgment capability the tutor engine depends on, and its
//! Bedrock Converse implementation.

pub mod client;
pub mod error;
pub mod extract;
pub mod judge;
pub mod tokens;

pub use crate::client::BedrockJudge;
pub use crate::error::BedrockError;
pub use crate::judge::{BoxFuture, Judge, DEFAULT_TEMPERATURE};
