use std::path::PathBuf;

use rounds_bedrock::BedrockError;
use rounds_core::error::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Judgment(#[from] BedrockError),

    #[error("template rendering failed: {0}")]
    TemplateRender(String),

    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("snapshot belongs to case {found}, session is running {expected}")]
    SnapshotMismatch { expected: String, found: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<tera::Error> for EngineError {
    fn from(e: tera::Error) -> Self {
        EngineError::TemplateRender(e.to_string())
    }
}
