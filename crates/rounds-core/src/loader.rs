//! Case and prompt file loading.
//!
//! Layout on disk:
//!
//! ```text
//! cases/<case_id>.json
//! prompts/base.json              {"base_instruction": "..."}
//! prompts/phases/<phase>.json    PhaseConfig fields + prompt guidance
//! ```
//!
//! Prompt files are optional: a missing file or field falls back to the
//! built-in default. A file that exists but is not valid JSON is an error.
//! Case files must be well formed; any defect fails the whole load.

use std::collections::{BTreeMap, HashSet};
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::models::case::{CaseData, CaseMetadata, Diagnosis};
use crate::models::phase::{ClinicalElement, Phase, PhaseConfig, PhaseType};

pub const DEFAULT_BASE_INSTRUCTION: &str = "\
You are an experienced attending physician leading a case-based teaching \
session with a medical learner. Teach Socratically: answer what the learner \
asks about the patient, reveal findings only when they are asked for, and \
prompt the learner to explain their reasoning. Do not give away the \
diagnosis.";

/// Contents of one `prompts/phases/<phase>.json` file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhaseDocument {
    #[serde(flatten)]
    pub config: PhaseConfig,
    #[serde(default)]
    pub core_instruction: String,
    #[serde(default)]
    pub focus_area: String,
    #[serde(default)]
    pub phase_specific_guidance: String,
    #[serde(default)]
    pub introduction: String,
}

#[derive(Debug, Deserialize)]
struct BaseDocument {
    #[serde(default = "default_base_instruction")]
    base_instruction: String,
}

fn default_base_instruction() -> String {
    DEFAULT_BASE_INSTRUCTION.to_string()
}

/// Base instruction plus one [`PhaseDocument`] per phase.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    pub base_instruction: String,
    phases: Vec<PhaseDocument>,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptLibrary {
    /// Library made only of built-in defaults.
    pub fn builtin() -> Self {
        Self {
            base_instruction: default_base_instruction(),
            phases: PhaseType::ALL
                .iter()
                .map(|_| PhaseDocument::default())
                .collect(),
        }
    }

    /// Load prompt files from `dir`, falling back to defaults for missing files.
    pub fn load(dir: &Path) -> Result<Self, CoreError> {
        let base_instruction = match read_optional::<BaseDocument>(&dir.join("base.json"))? {
            Some(doc) => doc.base_instruction,
            None => default_base_instruction(),
        };

        let mut phases = Vec::with_capacity(PhaseType::ALL.len());
        for phase_type in PhaseType::ALL {
            let path = dir.join("phases").join(format!("{phase_type}.json"));
            phases.push(read_optional::<PhaseDocument>(&path)?.unwrap_or_default());
        }

        info!(dir = %dir.display(), "prompt library loaded");

        Ok(Self {
            base_instruction,
            phases,
        })
    }

    pub fn document(&self, phase_type: PhaseType) -> &PhaseDocument {
        &self.phases[phase_type.index()]
    }

    pub fn config(&self, phase_type: PhaseType) -> PhaseConfig {
        self.document(phase_type).config.clone()
    }
}

fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CoreError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "prompt file missing, using defaults");
            return Ok(None);
        }
        Err(source) => {
            return Err(CoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| CoreError::MalformedPrompt {
            path: path.to_path_buf(),
            source,
        })
}

// ── Case documents ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CaseDocument {
    metadata: CaseMetadata,
    #[serde(default)]
    clinical_elements: BTreeMap<PhaseType, PhaseElements>,
    #[serde(default)]
    differential_diagnosis: Vec<Diagnosis>,
    final_diagnosis: Diagnosis,
}

#[derive(Debug, Default, Deserialize)]
struct PhaseElements {
    #[serde(default)]
    required: Vec<ClinicalElement>,
    #[serde(default)]
    optional: Vec<ClinicalElement>,
}

/// Load `<cases_dir>/<case_id>.json`.
pub fn load_case(
    cases_dir: &Path,
    case_id: &str,
    prompts: &PromptLibrary,
) -> Result<CaseData, CoreError> {
    let path = cases_dir.join(format!("{case_id}.json"));
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(CoreError::CaseNotFound(case_id.to_string()));
        }
        Err(source) => return Err(CoreError::Io { path, source }),
    };

    let case = parse_case(case_id, &contents, prompts)?;
    info!(
        case_id,
        title = %case.metadata.title,
        "case loaded"
    );
    Ok(case)
}

/// Parse a case document, attaching each phase's configuration.
///
/// Elicited and covered flags in the document are ignored: a freshly loaded
/// case always starts with nothing elicited.
pub fn parse_case(
    case_id: &str,
    contents: &str,
    prompts: &PromptLibrary,
) -> Result<CaseData, CoreError> {
    let document: CaseDocument =
        serde_json::from_str(contents).map_err(|e| CoreError::MalformedCase {
            case_id: case_id.to_string(),
            reason: e.to_string(),
        })?;

    let mut elements_by_phase = document.clinical_elements;
    let mut phases = BTreeMap::new();

    for phase_type in PhaseType::ALL {
        let elements = elements_by_phase.remove(&phase_type).unwrap_or_default();
        let mut phase = Phase::new(phase_type, prompts.config(phase_type));
        phase.required_elements = elements.required;
        phase.optional_elements = elements.optional;
        phase.reset();

        check_unique_elements(case_id, &phase)?;
        phases.insert(phase_type, phase);
    }

    Ok(CaseData::new(
        document.metadata,
        phases,
        document.differential_diagnosis,
        document.final_diagnosis,
    ))
}

fn check_unique_elements(case_id: &str, phase: &Phase) -> Result<(), CoreError> {
    let mut ids = HashSet::new();
    let mut contents = HashSet::new();
    for element in phase.elements() {
        let duplicate = if !ids.insert(element.id.as_str()) {
            Some(("id", element.id.as_str()))
        } else if !contents.insert(element.content.trim()) {
            Some(("content", element.content.as_str()))
        } else {
            None
        };
        if let Some((field, value)) = duplicate {
            return Err(CoreError::MalformedCase {
                case_id: case_id.to_string(),
                reason: format!(
                    "duplicate element {field} '{value}' in {} phase",
                    phase.phase_type
                ),
            });
        }
    }
    Ok(())
}

/// Case ids available in `cases_dir` (file stems of `*.json`), sorted.
pub fn list_cases(cases_dir: &Path) -> Result<Vec<String>, CoreError> {
    let entries = std::fs::read_dir(cases_dir).map_err(|source| CoreError::Io {
        path: cases_dir.to_path_buf(),
        source,
    })?;

    let mut ids: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();

    ids.sort();
    Ok(ids)
}
