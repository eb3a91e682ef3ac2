//! End-of-phase summaries.
//!
//! One judgment returns all three artifacts. Each field degrades on its own:
//! a missing or ill-typed field gets a placeholder while the others are kept.

use jiff::Timestamp;
use serde_json::{Map, Value};
use tracing::{info, warn};

use rounds_bedrock::Judge;
use rounds_core::models::assessment::PhaseSummary;
use rounds_core::models::case::CaseData;
use rounds_core::models::phase::Phase;
use rounds_core::models::transcript::Transcript;

use crate::prompt;

pub const SUMMARY_PLACEHOLDER: &str = "Phase summary could not be generated.";

const SUMMARY_SYSTEM_PROMPT: &str = "\
You are an attending physician wrapping up one phase of a teaching case \
with a medical learner. From the conversation, produce a JSON object with \
three fields: \"chat_summary\" (a short learner-facing summary of what was \
established and a transition to the next phase), \"learner_assessment\" (an \
object assessing the learner's performance: strengths, areas_for_improvement, \
missed_elements), and \"clinical_summary\" (an object grouping the clinical \
findings established so far by category).";

pub async fn generate_phase_summary(
    judge: &dyn Judge,
    case: &CaseData,
    phase: &Phase,
    transcript: &Transcript,
    temperature: f32,
) -> PhaseSummary {
    let request = format!(
        "Case: {}\nPhase: {}\n\nConversation:\n{}",
        case.metadata.title,
        phase.phase_type.label(),
        prompt::format_transcript(transcript.messages())
    );

    let response = match judge
        .judge_json(SUMMARY_SYSTEM_PROMPT, &request, temperature)
        .await
    {
        Ok(value) => value,
        Err(e) => {
            warn!(phase = %phase.phase_type, error = %e, "summary judgment failed");
            Value::Null
        }
    };

    let chat_summary = response
        .get("chat_summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(|| SUMMARY_PLACEHOLDER.to_string(), str::to_string);

    let summary = PhaseSummary {
        phase: phase.phase_type,
        completed_at: Timestamp::now(),
        chat_summary,
        learner_assessment: object_field(&response, "learner_assessment"),
        clinical_summary: object_field(&response, "clinical_summary"),
        covered_elements: phase
            .elements()
            .filter(|e| e.elicited)
            .map(|e| e.content.clone())
            .collect(),
    };

    info!(
        phase = %phase.phase_type,
        covered = summary.covered_elements.len(),
        "phase summary generated"
    );

    summary
}

fn object_field(response: &Value, key: &str) -> Value {
    match response.get(key) {
        Some(value @ Value::Object(_)) => value.clone(),
        _ => Value::Object(Map::new()),
    }
}
