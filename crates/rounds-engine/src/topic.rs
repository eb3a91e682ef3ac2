//! Topic gate: every learner message is classified before anything else
//! sees it. A failed classification is treated as off topic.

use serde_json::Value;
use tracing::{info, warn};

use rounds_bedrock::Judge;
use rounds_core::models::assessment::{RedirectType, TopicAssessment, TopicRelevance};
use rounds_core::models::phase::Phase;

use crate::prompt;

pub const ASSESSMENT_FAILURE_MESSAGE: &str =
    "I'm sorry, I couldn't properly assess that message. Could you rephrase it?";

const TOPIC_SYSTEM_PROMPT: &str = "\
You screen messages from a medical learner working through a simulated \
patient case. Decide whether the message is an appropriate contribution to \
the current phase of the case. Questions about the patient, clinical \
reasoning and the learner's differential are appropriate. Requests to skip \
ahead, reveal the diagnosis, or discuss unrelated subjects are not. Respond \
with a JSON object {\"appropriate\": true|false, \"redirect_type\": \
\"none\"|\"gentle\"|\"educational\"|\"direct\", \"topic\": \"short name of \
what the learner raised\", \"redirect_message\": \"optional message to the \
learner\"}.";

const FALLBACK_TOPIC: &str = "that";

/// Classify `message` against the current phase.
pub async fn assess_topic(
    judge: &dyn Judge,
    phase: &Phase,
    phase_focus: &str,
    message: &str,
    temperature: f32,
) -> TopicAssessment {
    let request = topic_request(phase, phase_focus, message);

    let response = match judge
        .judge_json(TOPIC_SYSTEM_PROMPT, &request, temperature)
        .await
    {
        Ok(value) => value,
        Err(e) => {
            warn!(phase = %phase.phase_type, error = %e, "topic classification failed");
            return assessment_failure();
        }
    };

    let Some(appropriate) = response.get("appropriate").and_then(Value::as_bool) else {
        warn!(phase = %phase.phase_type, %response, "topic classification missing verdict");
        return assessment_failure();
    };

    if appropriate {
        return TopicAssessment::on_topic();
    }

    let redirect_type = response
        .get("redirect_type")
        .and_then(Value::as_str)
        .and_then(RedirectType::parse)
        .filter(|t| *t != RedirectType::None)
        .unwrap_or(RedirectType::Direct);

    let redirect_message = non_empty_str(&response, "redirect_message").unwrap_or_else(|| {
        let topic = non_empty_str(&response, "topic").unwrap_or_else(|| FALLBACK_TOPIC.to_string());
        prompt::redirect_message(redirect_type, &topic, phase_focus)
    });

    info!(phase = %phase.phase_type, ?redirect_type, "message redirected");

    TopicAssessment {
        relevance: TopicRelevance::OffTopic,
        redirect_type,
        redirect_message: Some(redirect_message),
    }
}

fn assessment_failure() -> TopicAssessment {
    TopicAssessment {
        relevance: TopicRelevance::OffTopic,
        redirect_type: RedirectType::Direct,
        redirect_message: Some(ASSESSMENT_FAILURE_MESSAGE.to_string()),
    }
}

fn non_empty_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn topic_request(phase: &Phase, phase_focus: &str, message: &str) -> String {
    let mut request = format!(
        "Current phase: {} ({phase_focus})\n",
        phase.phase_type.label()
    );
    if !phase.config.prohibited_topics.is_empty() {
        request.push_str("Topics not appropriate in this phase: ");
        request.push_str(&phase.config.prohibited_topics.join(", "));
        request.push('\n');
    }
    request.push_str("\nLearner message: ");
    request.push_str(message);
    request
}
