use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;

pub const DEFAULT_OPENING_PROMPT: &str = "What would you like to know about the patient?";
pub const DEFAULT_COMPLETION_MESSAGE: &str = "Phase complete.";

/// The fixed sequence of phases a case moves through.
///
/// Ordering is total and advancement strictly sequential:
/// `History < Physical < Testing < Management < Discussion`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PhaseType {
    History,
    Physical,
    Testing,
    Management,
    Discussion,
}

impl PhaseType {
    pub const ALL: [PhaseType; 5] = [
        PhaseType::History,
        PhaseType::Physical,
        PhaseType::Testing,
        PhaseType::Management,
        PhaseType::Discussion,
    ];

    /// Position of this phase in [`PhaseType::ALL`].
    pub fn index(self) -> usize {
        match self {
            PhaseType::History => 0,
            PhaseType::Physical => 1,
            PhaseType::Testing => 2,
            PhaseType::Management => 3,
            PhaseType::Discussion => 4,
        }
    }

    /// The phase that follows this one, or `None` after `Discussion`.
    pub fn next(self) -> Option<PhaseType> {
        PhaseType::ALL.get(self.index() + 1).copied()
    }

    /// Wire name, also used for prompt file names (`history.json`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseType::History => "history",
            PhaseType::Physical => "physical",
            PhaseType::Testing => "testing",
            PhaseType::Management => "management",
            PhaseType::Discussion => "discussion",
        }
    }

    /// Capitalized name for learner-facing text.
    pub fn label(self) -> &'static str {
        match self {
            PhaseType::History => "History",
            PhaseType::Physical => "Physical",
            PhaseType::Testing => "Testing",
            PhaseType::Management => "Management",
            PhaseType::Discussion => "Discussion",
        }
    }
}

impl fmt::Display for PhaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhaseType::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownPhase(s.to_string()))
    }
}

/// Per-phase configuration, immutable once loaded.
///
/// Every field has a default so a partially written prompt file still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseConfig {
    #[serde(default = "default_opening_prompt")]
    pub opening_prompt: String,
    #[serde(default = "default_completion_message")]
    pub completion_message: String,
    #[serde(default)]
    pub prohibited_topics: Vec<String>,
    #[serde(default)]
    pub advancement_criteria: Vec<String>,
}

fn default_opening_prompt() -> String {
    DEFAULT_OPENING_PROMPT.to_string()
}

fn default_completion_message() -> String {
    DEFAULT_COMPLETION_MESSAGE.to_string()
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            opening_prompt: default_opening_prompt(),
            completion_message: default_completion_message(),
            prohibited_topics: Vec::new(),
            advancement_criteria: Vec::new(),
        }
    }
}

/// A teaching point attached to a clinical element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeachingPoint {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub covered: bool,
    #[serde(default)]
    pub coverage_notes: Option<String>,
}

impl TeachingPoint {
    /// Mark the point covered. Returns `false` if it already was.
    pub fn mark_covered(&mut self, notes: Option<&str>) -> bool {
        if self.covered {
            return false;
        }
        self.covered = true;
        self.coverage_notes = notes.filter(|n| !n.is_empty()).map(str::to_string);
        true
    }

    fn reset(&mut self) {
        self.covered = false;
        self.coverage_notes = None;
    }
}

/// A piece of clinical information the learner is expected to elicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalElement {
    pub id: String,
    pub content: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub teaching_points: Vec<TeachingPoint>,
    #[serde(default)]
    pub elicited: bool,
    #[serde(default)]
    pub elicited_content: Option<String>,
}

fn default_required() -> bool {
    true
}

impl ClinicalElement {
    pub fn new(id: impl Into<String>, content: impl Into<String>, required: bool) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            required,
            teaching_points: Vec::new(),
            elicited: false,
            elicited_content: None,
        }
    }

    pub fn with_teaching_point(mut self, id: impl Into<String>, content: impl Into<String>) -> Self {
        self.teaching_points.push(TeachingPoint {
            id: id.into(),
            content: content.into(),
            covered: false,
            coverage_notes: None,
        });
        self
    }

    /// Clear elicited state and every owned teaching point.
    pub fn reset(&mut self) {
        self.elicited = false;
        self.elicited_content = None;
        for point in &mut self.teaching_points {
            point.reset();
        }
    }
}

/// One phase of a case: the elements to elicit and the phase's configuration.
///
/// Teaching points are owned by elements; [`Phase::teaching_points`] is the
/// phase-wide view over them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub phase_type: PhaseType,
    pub required_elements: Vec<ClinicalElement>,
    pub optional_elements: Vec<ClinicalElement>,
    pub config: PhaseConfig,
}

impl Phase {
    pub fn new(phase_type: PhaseType, config: PhaseConfig) -> Self {
        Self {
            phase_type,
            required_elements: Vec::new(),
            optional_elements: Vec::new(),
            config,
        }
    }

    /// Required elements followed by optional ones.
    pub fn elements(&self) -> impl Iterator<Item = &ClinicalElement> {
        self.required_elements
            .iter()
            .chain(self.optional_elements.iter())
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut ClinicalElement> {
        self.required_elements
            .iter_mut()
            .chain(self.optional_elements.iter_mut())
    }

    /// Every teaching point in the phase. A point owned by several elements
    /// is yielded once, as its first copy.
    pub fn teaching_points(&self) -> impl Iterator<Item = &TeachingPoint> {
        let mut seen = HashSet::new();
        self.elements()
            .flat_map(|e| e.teaching_points.iter())
            .filter(move |p| seen.insert(p.id.as_str()))
    }

    /// True when every required element has been elicited.
    pub fn is_complete(&self) -> bool {
        self.required_elements.iter().all(|e| e.elicited)
    }

    pub fn uncovered_elements(&self) -> Vec<&ClinicalElement> {
        self.elements().filter(|e| !e.elicited).collect()
    }

    /// Fraction of required elements elicited; 1.0 for a phase without any.
    pub fn completion_ratio(&self) -> f64 {
        if self.required_elements.is_empty() {
            return 1.0;
        }
        let elicited = self.required_elements.iter().filter(|e| e.elicited).count();
        elicited as f64 / self.required_elements.len() as f64
    }

    /// Return every element and teaching point to its initial state.
    pub fn reset(&mut self) {
        for element in self.elements_mut() {
            element.reset();
        }
    }
}
