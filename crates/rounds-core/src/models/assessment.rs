//! Typed results of the external judgment calls.
//!
//! Judgment responses arrive as loosely shaped JSON; each call site parses
//! into one of these types and fills in defaults for anything missing.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::phase::{ClinicalElement, PhaseType, TeachingPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TopicRelevance {
    OnTopic,
    OffTopic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RedirectType {
    None,
    Gentle,
    Educational,
    Direct,
}

impl RedirectType {
    /// Parse a classifier-supplied redirect type; unknown values yield `None`.
    pub fn parse(value: &str) -> Option<RedirectType> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Some(RedirectType::None),
            "gentle" => Some(RedirectType::Gentle),
            "educational" => Some(RedirectType::Educational),
            "direct" => Some(RedirectType::Direct),
            _ => None,
        }
    }
}

/// Topic gate verdict for one learner message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TopicAssessment {
    pub relevance: TopicRelevance,
    pub redirect_type: RedirectType,
    pub redirect_message: Option<String>,
}

impl TopicAssessment {
    pub fn on_topic() -> Self {
        Self {
            relevance: TopicRelevance::OnTopic,
            redirect_type: RedirectType::None,
            redirect_message: None,
        }
    }

    pub fn is_on_topic(&self) -> bool {
        self.relevance == TopicRelevance::OnTopic
    }
}

/// What one coverage pass changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageAssessment {
    pub newly_covered_elements: Vec<ClinicalElement>,
    pub newly_covered_points: Vec<TeachingPoint>,
    /// Required elements still not covered after this pass.
    pub missing_critical_elements: Vec<ClinicalElement>,
    /// Set when the judge could not be consulted; nothing was marked.
    pub judge_failure: Option<String>,
}

/// Holistic phase completion verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionVerdict {
    pub can_advance: bool,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub missing_aspects: Vec<String>,
}

/// End-of-phase summaries, persisted per phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PhaseSummary {
    pub phase: PhaseType,
    pub completed_at: jiff::Timestamp,
    /// Learner-facing summary and transition.
    pub chat_summary: String,
    /// Private assessment of learner performance.
    pub learner_assessment: serde_json::Value,
    /// Clinical findings grouped by category.
    pub clinical_summary: serde_json::Value,
    pub covered_elements: Vec<String>,
}
