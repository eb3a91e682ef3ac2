//! Feedback on the learner's differential against the case's reference
//! differential.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tera::Context;
use tracing::{info, warn};
use ts_rs::TS;

use rounds_bedrock::Judge;
use rounds_core::models::case::{CaseData, Diagnosis};

use crate::error::EngineError;
use crate::prompt;

pub const COMPARISON_FAILURE_FEEDBACK: &str =
    "Differential feedback is unavailable right now. Please try again.";

pub const EMPTY_DIFFERENTIAL_FEEDBACK: &str =
    "Add at least one diagnosis to your differential before asking for feedback.";

const COMPARE_SYSTEM_PROMPT: &str = "\
You are an attending physician reviewing a medical learner's ranked \
differential diagnosis against the expert differential for a case. Do not \
reveal diagnoses the learner has missed by name in \"feedback\" or \"clues\"; \
give clues that point toward them instead. Respond with a JSON object \
{\"sufficient_match\": true|false, \"recall_rate\": number between 0 and 1, \
\"feedback\": \"overall feedback\", \"missing_key_diagnoses\": [names], \
\"ranking_feedback\": \"comments on the ordering\", \"clues\": [hints], \
\"inappropriate_inclusions\": [learner diagnoses that do not fit]}.";

const REPORT_TEMPLATE: &str = "\
## Differential feedback

{{ feedback }}

**Recall:** {{ recall_percent }}%{% if sufficient_match %} (sufficient){% endif %}
{% if ranking_feedback %}
**Ranking:** {{ ranking_feedback }}
{% endif %}{% if clues %}
**Clues:**
{% for clue in clues %}- {{ clue }}
{% endfor %}{% endif %}{% if inappropriate_inclusions %}
**Reconsider:**
{% for name in inappropriate_inclusions %}- {{ name }}
{% endfor %}{% endif %}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DifferentialFeedback {
    pub sufficient_match: bool,
    pub recall_rate: f64,
    pub feedback: String,
    pub missing_key_diagnoses: Vec<String>,
    pub ranking_feedback: String,
    pub clues: Vec<String>,
    pub inappropriate_inclusions: Vec<String>,
}

impl DifferentialFeedback {
    fn placeholder(feedback: &str, recall_rate: f64) -> Self {
        Self {
            sufficient_match: false,
            recall_rate,
            feedback: feedback.to_string(),
            missing_key_diagnoses: Vec::new(),
            ranking_feedback: String::new(),
            clues: Vec::new(),
            inappropriate_inclusions: Vec::new(),
        }
    }

    /// Markdown report for the learner. Missing diagnoses are left out.
    pub fn to_markdown(&self) -> Result<String, EngineError> {
        let mut context = Context::new();
        context.insert("feedback", &self.feedback);
        context.insert("recall_percent", &((self.recall_rate * 100.0).round() as i64));
        context.insert("sufficient_match", &self.sufficient_match);
        context.insert("ranking_feedback", &self.ranking_feedback);
        context.insert("clues", &self.clues);
        context.insert("inappropriate_inclusions", &self.inappropriate_inclusions);
        prompt::render("differential_report.md", REPORT_TEMPLATE, &context)
    }
}

/// Fraction of reference diagnoses named in the learner's list, compared
/// case-insensitively. 1.0 when the case has no reference differential.
pub fn recall_rate(learner: &[&Diagnosis], reference: &[Diagnosis]) -> f64 {
    if reference.is_empty() {
        return 1.0;
    }
    let found = reference
        .iter()
        .filter(|r| {
            learner
                .iter()
                .any(|l| l.name.trim().eq_ignore_ascii_case(r.name.trim()))
        })
        .count();
    found as f64 / reference.len() as f64
}

/// Compare the learner's ranked list with the case's reference differential.
pub async fn compare_differentials(
    judge: &dyn Judge,
    learner: &[&Diagnosis],
    case: &CaseData,
    temperature: f32,
) -> DifferentialFeedback {
    let local_recall = recall_rate(learner, &case.differential_diagnosis);

    if learner.is_empty() {
        return DifferentialFeedback::placeholder(EMPTY_DIFFERENTIAL_FEEDBACK, 0.0);
    }

    let request = comparison_request(learner, case);
    let response = match judge
        .judge_json(COMPARE_SYSTEM_PROMPT, &request, temperature)
        .await
    {
        Ok(value) => value,
        Err(e) => {
            warn!(case_id = %case.metadata.id, error = %e, "differential comparison failed");
            return DifferentialFeedback::placeholder(COMPARISON_FAILURE_FEEDBACK, local_recall);
        }
    };

    let feedback = DifferentialFeedback {
        sufficient_match: response
            .get("sufficient_match")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        recall_rate: response
            .get("recall_rate")
            .and_then(Value::as_f64)
            .filter(|r| r.is_finite())
            .map_or(local_recall, |r| r.clamp(0.0, 1.0)),
        feedback: response
            .get("feedback")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        missing_key_diagnoses: string_list(&response, "missing_key_diagnoses"),
        ranking_feedback: response
            .get("ranking_feedback")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        clues: string_list(&response, "clues"),
        inappropriate_inclusions: string_list(&response, "inappropriate_inclusions"),
    };

    info!(
        case_id = %case.metadata.id,
        sufficient = feedback.sufficient_match,
        recall = feedback.recall_rate,
        "differential compared"
    );

    feedback
}

fn string_list(response: &Value, key: &str) -> Vec<String> {
    response
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn comparison_request(learner: &[&Diagnosis], case: &CaseData) -> String {
    let mut request = String::from("Learner's differential, most likely first:\n");
    for (rank, diagnosis) in learner.iter().enumerate() {
        request.push_str(&format!(
            "{}. {} ({})\n",
            rank + 1,
            diagnosis.name,
            diagnosis.category
        ));
    }

    request.push_str("\nExpert differential:\n");
    for diagnosis in &case.differential_diagnosis {
        request.push_str(&format!("- {} ({})", diagnosis.name, diagnosis.category));
        if !diagnosis.key_features.is_empty() {
            request.push_str(&format!(": {}", diagnosis.key_features.join("; ")));
        }
        request.push('\n');
    }

    request.push_str(&format!("\nFinal diagnosis: {}\n", case.final_diagnosis.name));
    request
}
