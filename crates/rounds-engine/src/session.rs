//! One learner working through one case.
//!
//! [`Session`] owns everything per-learner: the case (and its element
//! state), the phase machine and its caches, the transcript, the
//! differential, and the phase summaries. Every operation takes
//! `&mut self` and awaits its judgment calls one at a time.

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use rounds_bedrock::{Judge, DEFAULT_TEMPERATURE};
use rounds_core::loader::PromptLibrary;
use rounds_core::models::assessment::{CoverageAssessment, PhaseSummary, TopicAssessment};
use rounds_core::models::case::{CaseData, CaseMetadata};
use rounds_core::models::phase::{Phase, PhaseType};
use rounds_core::models::transcript::{ChatMessage, Transcript};

use crate::compare::{self, DifferentialFeedback};
use crate::coverage;
use crate::differential::{DifferentialEntry, DifferentialLedger, DifferentialUpdate};
use crate::error::EngineError;
use crate::persistence::SessionSnapshot;
use crate::phase::{PhaseMachine, PhaseProgress};
use crate::prompt::{self, TurnContext};
use crate::summary;
use crate::topic;

pub const TUTOR_FAILURE_MESSAGE: &str =
    "I'm having trouble responding right now. Please try again.";

/// What handling one learner message produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Text to show the learner: the tutor's reply or a redirect.
    pub reply: String,
    pub topic: TopicAssessment,
    /// `None` when the message never reached coverage assessment.
    pub coverage: Option<CoverageAssessment>,
    pub phase_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseProgress {
    pub case_id: String,
    pub current_phase: PhaseType,
    pub phase_progress: PhaseProgress,
    pub elements_covered: usize,
    pub elements_total: usize,
    pub teaching_points_covered: usize,
    pub teaching_points_total: usize,
    pub completion_ratio: f64,
    pub elapsed_seconds: i64,
    pub summarized_phases: Vec<PhaseType>,
}

/// Everything a learner produced in a session, for review outside the tutor.
#[derive(Debug, Clone, Serialize)]
pub struct SessionExport {
    pub session_id: Uuid,
    pub case: CaseMetadata,
    pub started_at: Timestamp,
    pub exported_at: Timestamp,
    pub progress: CaseProgress,
    pub transcript: Vec<ChatMessage>,
    pub summaries: Vec<PhaseSummary>,
    pub learner_assessments: BTreeMap<PhaseType, serde_json::Value>,
    pub differential: Vec<DifferentialEntry>,
    pub differential_updates: Vec<DifferentialUpdate>,
}

pub struct Session {
    id: Uuid,
    started_at: Timestamp,
    case: CaseData,
    prompts: PromptLibrary,
    machine: PhaseMachine,
    transcript: Transcript,
    ledger: DifferentialLedger,
    summaries: BTreeMap<PhaseType, PhaseSummary>,
    temperature: f32,
}

impl Session {
    /// Start a session on `case`: the first phase is initialized and the
    /// transcript opens with the case presentation and the phase prompt.
    pub fn new(mut case: CaseData, prompts: PromptLibrary) -> Self {
        let mut machine = PhaseMachine::new();
        machine.begin(&mut case);

        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::presentation(prompt::case_presentation(&case)));
        transcript.push(ChatMessage::assistant(prompt::phase_opening(
            &prompts,
            case.phase(machine.current()),
        )));

        let id = Uuid::new_v4();
        info!(session_id = %id, case_id = %case.metadata.id, "session started");

        Self {
            id,
            started_at: Timestamp::now(),
            case,
            prompts,
            machine,
            transcript,
            ledger: DifferentialLedger::new(),
            summaries: BTreeMap::new(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn case(&self) -> &CaseData {
        &self.case
    }

    pub fn current_phase(&self) -> PhaseType {
        self.machine.current()
    }

    pub fn phase(&self) -> &Phase {
        self.case.phase(self.machine.current())
    }

    pub fn machine(&self) -> &PhaseMachine {
        &self.machine
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn ledger(&self) -> &DifferentialLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut DifferentialLedger {
        &mut self.ledger
    }

    pub fn summary(&self, phase_type: PhaseType) -> Option<&PhaseSummary> {
        self.summaries.get(&phase_type)
    }

    pub fn phase_progress(&self) -> PhaseProgress {
        self.machine.progress(self.phase())
    }

    /// Run one learner message through the topic gate, the tutor, coverage
    /// assessment and the completion check, in that order.
    pub async fn handle_message(&mut self, judge: &dyn Judge, message: &str) -> TurnOutcome {
        let current = self.machine.current();
        let focus = prompt::phase_focus(&self.prompts, current);

        let topic = topic::assess_topic(
            judge,
            self.case.phase(current),
            &focus,
            message,
            self.temperature,
        )
        .await;

        if !topic.is_on_topic() {
            return TurnOutcome {
                reply: topic.redirect_message.clone().unwrap_or_default(),
                topic,
                coverage: None,
                phase_complete: self.phase_progress() == PhaseProgress::Complete,
            };
        }

        let reply = match self.tutor_reply(judge, message).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "tutor reply failed");
                return TurnOutcome {
                    reply: TUTOR_FAILURE_MESSAGE.to_string(),
                    topic,
                    coverage: None,
                    phase_complete: self.phase_progress() == PhaseProgress::Complete,
                };
            }
        };

        self.transcript.push(ChatMessage::user(message));
        self.transcript.push(ChatMessage::assistant(reply.clone()));

        let coverage = coverage::assess_coverage(
            judge,
            self.case.phase_mut(current),
            self.machine.coverage_mut(),
            message,
            &reply,
            self.temperature,
        )
        .await;

        let phase_complete = self
            .machine
            .check_completion(
                judge,
                self.case.phase_mut(current),
                &self.transcript,
                self.temperature,
            )
            .await;

        TurnOutcome {
            reply,
            topic,
            coverage: Some(coverage),
            phase_complete,
        }
    }

    async fn tutor_reply(&self, judge: &dyn Judge, message: &str) -> Result<String, EngineError> {
        let phase = self.phase();
        let system = prompt::system_prompt(&self.prompts, &self.case, phase)?;
        let user_turn = TurnContext::new(
            phase,
            &self.transcript,
            &self.ledger,
            self.machine.block_rationale(),
        )
        .wrap(message)?;

        tracing::debug!(session_id = %self.id, system_len = system.len(), "tutor prompt assembled");

        let reply = judge
            .converse(&system, self.transcript.messages(), &user_turn, self.temperature)
            .await?;
        Ok(reply)
    }

    /// A question pointing at the first missing required element, or a
    /// synthesis question once nothing required is missing.
    pub fn hint(&self) -> String {
        let phase = self.phase();
        let missing: Vec<_> = phase
            .required_elements
            .iter()
            .filter(|e| !e.elicited && !self.machine.coverage().contains(&e.id))
            .cloned()
            .collect();
        prompt::probe_question(&missing)
            .unwrap_or_else(|| prompt::follow_up_question(phase.phase_type).to_string())
    }

    /// Summarize the current phase, replacing any earlier summary for it.
    pub async fn generate_summary(&mut self, judge: &dyn Judge) -> &PhaseSummary {
        let current = self.machine.current();
        let summary = summary::generate_phase_summary(
            judge,
            &self.case,
            self.case.phase(current),
            &self.transcript,
            self.temperature,
        )
        .await;

        self.summaries.insert(current, summary);
        &self.summaries[&current]
    }

    pub async fn compare_differential(&self, judge: &dyn Judge) -> DifferentialFeedback {
        let learner = self.ledger.ranked_list();
        compare::compare_differentials(judge, &learner, &self.case, self.temperature).await
    }

    /// Move to the next phase when the current one is complete.
    ///
    /// The outgoing phase is summarized first if it has no summary yet,
    /// since the transcript it is built from does not survive the move. On
    /// success the transcript is cut back to the case presentation and the
    /// new phase's opening prompt is appended after the outgoing phase's
    /// completion message.
    pub async fn advance(&mut self, judge: &dyn Judge) -> Option<String> {
        let current = self.machine.current();
        if self.phase_progress() != PhaseProgress::Complete || current.next().is_none() {
            return None;
        }
        if !self.summaries.contains_key(&current) {
            self.generate_summary(judge).await;
        }

        let completion_message = self.machine.advance(&mut self.case)?;

        self.transcript.truncate_to_presentation();
        let opening = prompt::phase_opening(&self.prompts, self.phase());
        self.transcript
            .push(ChatMessage::assistant(format!("{completion_message}\n\n{opening}")));

        info!(
            session_id = %self.id,
            phase = %self.machine.current(),
            "entered phase"
        );
        Some(completion_message)
    }

    pub fn progress(&self) -> CaseProgress {
        let phase = self.phase();
        let cache = self.machine.coverage();
        let covered = |id: &str, elicited: bool| elicited || cache.contains(id);

        CaseProgress {
            case_id: self.case.metadata.id.clone(),
            current_phase: phase.phase_type,
            phase_progress: self.machine.progress(phase),
            elements_covered: phase.elements().filter(|e| covered(&e.id, e.elicited)).count(),
            elements_total: phase.elements().count(),
            teaching_points_covered: phase.teaching_points().filter(|p| p.covered).count(),
            teaching_points_total: phase.teaching_points().count(),
            completion_ratio: phase.completion_ratio(),
            elapsed_seconds: Timestamp::now().duration_since(self.started_at).as_secs(),
            summarized_phases: self.summaries.keys().copied().collect(),
        }
    }

    pub fn export(&self) -> SessionExport {
        SessionExport {
            session_id: self.id,
            case: self.case.metadata.clone(),
            started_at: self.started_at,
            exported_at: Timestamp::now(),
            progress: self.progress(),
            transcript: self.transcript.messages().to_vec(),
            summaries: self.summaries.values().cloned().collect(),
            learner_assessments: self
                .summaries
                .iter()
                .map(|(phase, s)| (*phase, s.learner_assessment.clone()))
                .collect(),
            differential: self.ledger.export_state(),
            differential_updates: self.ledger.updates().to_vec(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            case_id: self.case.metadata.id.clone(),
            saved_at: Timestamp::now(),
            current_phase: self.machine.current(),
            differential: self.ledger.export_state(),
            summaries: self.summaries.values().cloned().collect(),
            transcript: self.transcript.clone(),
        }
    }

    /// Bring back the differential and phase summaries from a snapshot of a
    /// session on the same case. Phase progress is not restored.
    pub fn resume_from(&mut self, snapshot: SessionSnapshot) -> Result<(), EngineError> {
        if snapshot.case_id != self.case.metadata.id {
            return Err(EngineError::SnapshotMismatch {
                expected: self.case.metadata.id.clone(),
                found: snapshot.case_id,
            });
        }

        self.ledger.restore_all(snapshot.differential);
        for summary in snapshot.summaries {
            self.summaries.insert(summary.phase, summary);
        }

        info!(
            session_id = %self.id,
            from = %snapshot.session_id,
            diagnoses = self.ledger.len(),
            "session resumed from snapshot"
        );
        Ok(())
    }
}
