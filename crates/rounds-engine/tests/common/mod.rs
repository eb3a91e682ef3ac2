#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use rounds_bedrock::{BedrockError, BoxFuture, Judge};
use rounds_core::loader::PromptLibrary;
use rounds_core::models::case::{CaseData, CaseMetadata, Diagnosis, DiagnosisCategory};
use rounds_core::models::phase::{ClinicalElement, Phase, PhaseConfig, PhaseType};
use rounds_core::models::transcript::ChatMessage;

/// In-memory judge that replays queued replies in order.
///
/// An empty queue yields an invocation error, so a test that expects no
/// call fails loudly if one is made.
#[derive(Default)]
pub struct ScriptedJudge {
    json: Mutex<VecDeque<Result<serde_json::Value, String>>>,
    text: Mutex<VecDeque<Result<String, String>>>,
    json_calls: AtomicUsize,
    converse_calls: AtomicUsize,
    requests: Mutex<Vec<String>>,
}

impl ScriptedJudge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(self, value: serde_json::Value) -> Self {
        self.json.lock().unwrap().push_back(Ok(value));
        self
    }

    pub fn json_failure(self, reason: &str) -> Self {
        self.json.lock().unwrap().push_back(Err(reason.to_string()));
        self
    }

    pub fn text(self, reply: &str) -> Self {
        self.text.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn text_failure(self, reason: &str) -> Self {
        self.text.lock().unwrap().push_back(Err(reason.to_string()));
        self
    }

    pub fn push_json(&self, value: serde_json::Value) {
        self.json.lock().unwrap().push_back(Ok(value));
    }

    pub fn push_text(&self, reply: &str) {
        self.text.lock().unwrap().push_back(Ok(reply.to_string()));
    }

    pub fn json_calls(&self) -> usize {
        self.json_calls.load(Ordering::SeqCst)
    }

    pub fn converse_calls(&self) -> usize {
        self.converse_calls.load(Ordering::SeqCst)
    }

    /// User content of every call, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn pending(&self) -> usize {
        self.json.lock().unwrap().len() + self.text.lock().unwrap().len()
    }
}

impl Judge for ScriptedJudge {
    fn judge_json<'a>(
        &'a self,
        _system_prompt: &'a str,
        user_message: &'a str,
        _temperature: f32,
    ) -> BoxFuture<'a, Result<serde_json::Value, BedrockError>> {
        Box::pin(async move {
            self.json_calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(user_message.to_string());
            match self.json.lock().unwrap().pop_front() {
                Some(Ok(value)) => Ok(value),
                Some(Err(reason)) => Err(BedrockError::Invocation(reason)),
                None => Err(BedrockError::Invocation("no scripted reply".to_string())),
            }
        })
    }

    fn converse<'a>(
        &'a self,
        _system_prompt: &'a str,
        _history: &'a [ChatMessage],
        user_message: &'a str,
        _temperature: f32,
    ) -> BoxFuture<'a, Result<String, BedrockError>> {
        Box::pin(async move {
            self.converse_calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(user_message.to_string());
            match self.text.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(reason)) => Err(BedrockError::Invocation(reason)),
                None => Err(BedrockError::Invocation("no scripted reply".to_string())),
            }
        })
    }
}

/// History with two required elements (E1 with a teaching point) and one
/// optional; Physical with one required element.
pub fn small_case() -> CaseData {
    let mut history = Phase::new(
        PhaseType::History,
        PhaseConfig {
            completion_message: "History complete.".to_string(),
            advancement_criteria: vec!["Characterize the cough".to_string()],
            ..PhaseConfig::default()
        },
    );
    history.required_elements = vec![
        ClinicalElement::new("E1", "Onset of cough", true)
            .with_teaching_point("TP1", "Acute onset favors infection"),
        ClinicalElement::new("E2", "Sputum character", true),
    ];
    history.optional_elements = vec![ClinicalElement::new("O1", "Travel history", false)];

    let mut physical = Phase::new(PhaseType::Physical, PhaseConfig::default());
    physical.required_elements = vec![ClinicalElement::new("P1", "Lung auscultation", true)];

    let mut phases = BTreeMap::new();
    phases.insert(PhaseType::History, history);
    phases.insert(PhaseType::Physical, physical);

    CaseData::new(
        CaseMetadata {
            id: "small-case".to_string(),
            title: "Cough and fever".to_string(),
            difficulty: "easy".to_string(),
            specialties: vec!["internal medicine".to_string()],
            keywords: Vec::new(),
        },
        phases,
        vec![
            Diagnosis::named("Community-acquired pneumonia", DiagnosisCategory::Likely),
            Diagnosis::named("Pulmonary embolism", DiagnosisCategory::DontMiss),
        ],
        Diagnosis::named("Community-acquired pneumonia", DiagnosisCategory::Likely),
    )
}

pub fn prompts() -> PromptLibrary {
    PromptLibrary::builtin()
}
