//! Phase completion state machine.
//!
//! Per phase: `NotStarted → InProgress → ElementsSatisfied → Complete`.
//! The step to `ElementsSatisfied` is a local check over required elements.
//! The step to `Complete` needs one holistic judgment over the transcript,
//! and its verdict is cached:
//!
//! - a positive verdict is final for the phase;
//! - a negative verdict is kept for the exchange count it was given at, so
//!   the judge is asked again only after the learner has said something new.

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ts_rs::TS;

use rounds_bedrock::Judge;
use rounds_core::models::assessment::CompletionVerdict;
use rounds_core::models::case::CaseData;
use rounds_core::models::phase::{Phase, PhaseType};
use rounds_core::models::transcript::Transcript;

use crate::coverage::CoverageCache;
use crate::prompt;

const COMPLETION_SYSTEM_PROMPT: &str = "\
You are an attending physician deciding whether a medical learner has done \
enough in the current phase of a teaching case to move on. Consider the \
whole conversation and the advancement criteria. Respond with a JSON object \
{\"can_advance\": true|false, \"rationale\": \"one or two sentences\", \
\"missing_aspects\": [\"what is still missing\"]}.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PhaseProgress {
    NotStarted,
    InProgress,
    ElementsSatisfied,
    Complete,
}

/// A cached holistic verdict and the exchange count it was given at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub verdict: CompletionVerdict,
    pub exchange_count: usize,
    pub checked_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct PhaseMachine {
    current: PhaseType,
    started: bool,
    coverage: CoverageCache,
    completion: BTreeMap<PhaseType, CompletionRecord>,
    block_rationale: Option<String>,
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self {
            current: PhaseType::History,
            started: false,
            coverage: CoverageCache::new(),
            completion: BTreeMap::new(),
            block_rationale: None,
        }
    }

    pub fn current(&self) -> PhaseType {
        self.current
    }

    pub fn coverage(&self) -> &CoverageCache {
        &self.coverage
    }

    pub fn coverage_mut(&mut self) -> &mut CoverageCache {
        &mut self.coverage
    }

    /// Why the last holistic check said "not yet", if it did.
    pub fn block_rationale(&self) -> Option<&str> {
        self.block_rationale.as_deref()
    }

    pub fn completion_record(&self, phase_type: PhaseType) -> Option<&CompletionRecord> {
        self.completion.get(&phase_type)
    }

    /// Start the first phase. Calling it again restarts the current phase.
    pub fn begin(&mut self, case: &mut CaseData) {
        self.initialize(case);
        self.started = true;
        info!(phase = %self.current, "phase started");
    }

    pub fn progress(&self, phase: &Phase) -> PhaseProgress {
        if !self.started {
            return PhaseProgress::NotStarted;
        }
        if !self.elements_satisfied(phase) {
            return PhaseProgress::InProgress;
        }
        match self.completion.get(&phase.phase_type) {
            Some(record) if record.verdict.can_advance => PhaseProgress::Complete,
            _ => PhaseProgress::ElementsSatisfied,
        }
    }

    /// Decide whether `phase` is complete, consulting the judge only when
    /// every required element is elicited and no usable verdict is cached.
    pub async fn check_completion(
        &mut self,
        judge: &dyn Judge,
        phase: &mut Phase,
        transcript: &Transcript,
        temperature: f32,
    ) -> bool {
        let phase_type = phase.phase_type;
        let exchange_count = transcript.exchange_count();

        if let Some(record) = self.completion.get(&phase_type) {
            if record.verdict.can_advance {
                return true;
            }
        }

        self.coverage.refresh(phase);
        if !phase.is_complete() {
            debug!(phase = %phase_type, "required elements outstanding");
            return false;
        }

        if exchange_count == 0 {
            return false;
        }

        if let Some(record) = self.completion.get(&phase_type) {
            if record.exchange_count == exchange_count {
                debug!(phase = %phase_type, exchange_count, "reusing cached negative verdict");
                return false;
            }
        }

        let request = completion_request(phase, transcript);
        let verdict = match judge
            .judge_json(COMPLETION_SYSTEM_PROMPT, &request, temperature)
            .await
            .map_err(|e| e.to_string())
            .and_then(|value| {
                serde_json::from_value::<CompletionVerdict>(value).map_err(|e| e.to_string())
            }) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(phase = %phase_type, error = %e, "completion judgment failed");
                return false;
            }
        };

        let can_advance = verdict.can_advance;
        if can_advance {
            self.block_rationale = None;
        } else {
            self.block_rationale = Some(block_rationale(&verdict));
        }

        info!(
            phase = %phase_type,
            can_advance,
            exchange_count,
            rationale = %verdict.rationale,
            "completion verdict"
        );

        self.completion.insert(
            phase_type,
            CompletionRecord {
                verdict,
                exchange_count,
                checked_at: Timestamp::now(),
            },
        );

        can_advance
    }

    /// Move to the next phase if the current one is complete.
    ///
    /// Returns the outgoing phase's completion message, or `None` (changing
    /// nothing) when the phase is not complete or is the last one.
    pub fn advance(&mut self, case: &mut CaseData) -> Option<String> {
        if self.progress(case.phase(self.current)) != PhaseProgress::Complete {
            return None;
        }
        let next = self.current.next()?;
        let message = case.phase(self.current).config.completion_message.clone();

        info!(from = %self.current, to = %next, "advancing phase");
        self.current = next;
        self.initialize(case);

        Some(message)
    }

    fn initialize(&mut self, case: &mut CaseData) {
        self.coverage.clear();
        self.completion.remove(&self.current);
        self.block_rationale = None;
        case.phase_mut(self.current).reset();
    }

    fn elements_satisfied(&self, phase: &Phase) -> bool {
        phase
            .required_elements
            .iter()
            .all(|e| e.elicited || self.coverage.contains(&e.id))
    }
}

fn block_rationale(verdict: &CompletionVerdict) -> String {
    let rationale = verdict.rationale.trim();
    match (rationale.is_empty(), verdict.missing_aspects.is_empty()) {
        (false, _) => rationale.to_string(),
        (true, false) => format!("Still missing: {}", verdict.missing_aspects.join(", ")),
        (true, true) => "The phase is not yet complete.".to_string(),
    }
}

fn completion_request(phase: &Phase, transcript: &Transcript) -> String {
    let mut request = format!(
        "Phase: {}\n\nConversation:\n{}\n",
        phase.phase_type.label(),
        prompt::format_transcript(transcript.messages())
    );

    if !phase.config.advancement_criteria.is_empty() {
        request.push_str("\nAdvancement criteria:\n");
        for criterion in &phase.config.advancement_criteria {
            request.push_str("- ");
            request.push_str(criterion);
            request.push('\n');
        }
    }

    request.push_str("\nElements elicited:\n");
    for element in phase.elements().filter(|e| e.elicited) {
        request.push_str("- ");
        request.push_str(&element.content);
        request.push('\n');
    }

    request
}
