use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;

use super::phase::{Phase, PhaseConfig, PhaseType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DiagnosisCategory {
    Likely,
    Possible,
    DontMiss,
}

impl DiagnosisCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosisCategory::Likely => "likely",
            DiagnosisCategory::Possible => "possible",
            DiagnosisCategory::DontMiss => "dont_miss",
        }
    }
}

impl fmt::Display for DiagnosisCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagnosisCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "likely" => Ok(DiagnosisCategory::Likely),
            "possible" => Ok(DiagnosisCategory::Possible),
            "dont_miss" | "don't_miss" => Ok(DiagnosisCategory::DontMiss),
            _ => Err(CoreError::UnknownCategory(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Diagnosis {
    pub name: String,
    pub category: DiagnosisCategory,
    #[serde(default)]
    pub key_features: Vec<String>,
    #[serde(default)]
    pub supporting_evidence: Vec<String>,
    #[serde(default)]
    pub refuting_evidence: Vec<String>,
}

impl Diagnosis {
    /// A learner-entered diagnosis: a name and category, no reference data.
    pub fn named(name: impl Into<String>, category: DiagnosisCategory) -> Self {
        Self {
            name: name.into(),
            category,
            key_features: Vec::new(),
            supporting_evidence: Vec::new(),
            refuting_evidence: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseMetadata {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// A loaded case: metadata, one [`Phase`] per [`PhaseType`], and the
/// reference diagnoses used for feedback.
#[derive(Debug, Clone, Serialize)]
pub struct CaseData {
    pub metadata: CaseMetadata,
    phases: Vec<Phase>,
    pub differential_diagnosis: Vec<Diagnosis>,
    pub final_diagnosis: Diagnosis,
}

impl CaseData {
    /// Build a case. Phases absent from `phases` are filled with an empty
    /// phase using the default configuration, so every phase type resolves.
    pub fn new(
        metadata: CaseMetadata,
        mut phases: BTreeMap<PhaseType, Phase>,
        differential_diagnosis: Vec<Diagnosis>,
        final_diagnosis: Diagnosis,
    ) -> Self {
        let phases = PhaseType::ALL
            .into_iter()
            .map(|phase_type| {
                phases
                    .remove(&phase_type)
                    .unwrap_or_else(|| Phase::new(phase_type, PhaseConfig::default()))
            })
            .collect();

        Self {
            metadata,
            phases,
            differential_diagnosis,
            final_diagnosis,
        }
    }

    pub fn phase(&self, phase_type: PhaseType) -> &Phase {
        &self.phases[phase_type.index()]
    }

    pub fn phase_mut(&mut self, phase_type: PhaseType) -> &mut Phase {
        &mut self.phases[phase_type.index()]
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }
}
