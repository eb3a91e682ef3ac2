use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("case not found: {0}")]
    CaseNotFound(String),

    #[error("malformed case {case_id}: {reason}")]
    MalformedCase { case_id: String, reason: String },

    #[error("malformed prompt file {path}: {source}")]
    MalformedPrompt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown phase: {0}")]
    UnknownPhase(String),

    #[error("unknown diagnosis category: {0}")]
    UnknownCategory(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
