//! Session snapshots on local disk.
//!
//! One pretty-printed JSON file per session at `<dir>/<session id>.json`,
//! written atomically (tmp + rename).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rounds_core::models::assessment::PhaseSummary;
use rounds_core::models::phase::PhaseType;
use rounds_core::models::transcript::Transcript;

use crate::differential::DifferentialEntry;
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub case_id: String,
    pub saved_at: Timestamp,
    pub current_phase: PhaseType,
    pub differential: Vec<DifferentialEntry>,
    #[serde(default)]
    pub summaries: Vec<PhaseSummary>,
    #[serde(default)]
    pub transcript: Transcript,
}

pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, session_id: Uuid) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }

    /// Write the snapshot, replacing any earlier one for the same session.
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<PathBuf, EngineError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        std::fs::create_dir_all(&self.dir).map_err(|source| EngineError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(snapshot.session_id);
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json).map_err(|source| EngineError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        std::fs::rename(&tmp_path, &path).map_err(|source| EngineError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "session snapshot saved");
        Ok(path)
    }

    pub fn load(&self, session_id: Uuid) -> Result<SessionSnapshot, EngineError> {
        let path = self.path_for(session_id);
        let json = match std::fs::read(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(EngineError::SnapshotNotFound(session_id.to_string()));
            }
            Err(source) => return Err(EngineError::Io { path, source }),
        };
        let snapshot = serde_json::from_slice(&json)?;
        tracing::debug!(path = %path.display(), "session snapshot loaded");
        Ok(snapshot)
    }

    /// Session ids with a snapshot in the store, sorted.
    pub fn list(&self) -> Result<Vec<Uuid>, EngineError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(EngineError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut ids: Vec<Uuid> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| Uuid::parse_str(stem).ok())
            })
            .collect();
        ids.sort();
        Ok(ids)
    }
}
