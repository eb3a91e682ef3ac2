//! Phase-aware prompt and context assembly.
//!
//! The tutor's system prompt is rendered with Tera from a built-in template
//! and the phase's prompt document. Each learner turn is sent as a JSON
//! context object followed by the learner's message.

use serde::Serialize;
use tera::{Context, Tera};

use rounds_core::loader::PromptLibrary;
use rounds_core::models::assessment::RedirectType;
use rounds_core::models::case::CaseData;
use rounds_core::models::phase::{ClinicalElement, Phase, PhaseType};
use rounds_core::models::transcript::{ChatMessage, ChatRole, Transcript};

use crate::differential::DifferentialLedger;
use crate::error::EngineError;

pub const EMPTY_TRANSCRIPT_PLACEHOLDER: &str = "No substantive discussion has occurred yet.";

const SYSTEM_PROMPT_TEMPLATE: &str = "\
{{ base_instruction }}

Case: {{ case_title }}
Current phase: {{ phase_label }}
{% if core_instruction %}
{{ core_instruction }}
{% endif %}{% if focus_area %}
Focus area: {{ focus_area }}
{% endif %}
Clinical elements for this phase (✓ elicited, ○ not yet elicited):
{% if elements %}{% for element in elements %}{% if element.elicited %}✓{% else %}○{% endif %} {{ element.content }}{% if not element.required %} (optional){% endif %}
{% endfor %}{% else %}(none)
{% endif %}{% if teaching_points %}
Teaching points still to cover:
{% for point in teaching_points %}- {{ point }}
{% endfor %}{% endif %}{% if prohibited_topics %}
If the learner raises any of these topics, redirect them to the current phase:
{% for topic in prohibited_topics %}- {{ topic }}
{% endfor %}{% endif %}{% if guidance %}
{{ guidance }}
{% endif %}
Do not reveal findings the learner has not asked for, and do not name the diagnosis.";

/// Render a Tera template held in memory.
pub fn render(name: &str, template: &str, context: &Context) -> Result<String, EngineError> {
    let mut tera = Tera::default();
    tera.add_raw_template(name, template)?;
    let rendered = tera.render(name, context)?;
    Ok(rendered)
}

/// System prompt for the tutor in `phase`.
pub fn system_prompt(
    prompts: &PromptLibrary,
    case: &CaseData,
    phase: &Phase,
) -> Result<String, EngineError> {
    let document = prompts.document(phase.phase_type);

    let remaining_points: Vec<&str> = phase
        .teaching_points()
        .filter(|p| !p.covered)
        .map(|p| p.content.as_str())
        .collect();
    let elements: Vec<&ClinicalElement> = phase.elements().collect();

    let mut context = Context::new();
    context.insert("base_instruction", &prompts.base_instruction);
    context.insert("case_title", &case.metadata.title);
    context.insert("phase_label", phase.phase_type.label());
    context.insert("core_instruction", &document.core_instruction);
    context.insert("focus_area", &document.focus_area);
    context.insert("elements", &elements);
    context.insert("teaching_points", &remaining_points);
    context.insert("prohibited_topics", &phase.config.prohibited_topics);
    context.insert("guidance", &document.phase_specific_guidance);

    render("system_prompt.txt", SYSTEM_PROMPT_TEMPLATE, &context)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryLine {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifferentialLine {
    pub name: String,
    /// 1-based rank as the learner sees it.
    pub order: usize,
    pub notes: String,
}

/// Context object sent ahead of every learner message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnContext {
    pub current_phase: PhaseType,
    pub chat_history: Vec<HistoryLine>,
    pub differential: Vec<DifferentialLine>,
    pub covered_elements: Vec<String>,
    pub uncovered_elements: Vec<String>,
    pub completion_block_rationale: Option<String>,
}

impl TurnContext {
    pub fn new(
        phase: &Phase,
        transcript: &Transcript,
        ledger: &DifferentialLedger,
        block_rationale: Option<&str>,
    ) -> Self {
        let (covered, uncovered): (Vec<&ClinicalElement>, Vec<&ClinicalElement>) =
            phase.required_elements.iter().partition(|e| e.elicited);

        Self {
            current_phase: phase.phase_type,
            chat_history: transcript
                .messages()
                .iter()
                .map(|m| HistoryLine {
                    role: m.role,
                    content: m.content.clone(),
                })
                .collect(),
            differential: ledger
                .ranked()
                .into_iter()
                .map(|h| DifferentialLine {
                    name: h.diagnosis.name.clone(),
                    order: h.order_index + 1,
                    notes: h.notes.clone(),
                })
                .collect(),
            covered_elements: covered.iter().map(|e| e.content.clone()).collect(),
            uncovered_elements: uncovered.iter().map(|e| e.content.clone()).collect(),
            completion_block_rationale: block_rationale.map(str::to_string),
        }
    }

    /// The user turn sent to the tutor: context JSON, then the message.
    pub fn wrap(&self, user_input: &str) -> Result<String, EngineError> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(format!("{json}\n\nUser message: {user_input}"))
    }
}

/// What the learner should be working on in `phase_type`.
pub fn phase_focus(prompts: &PromptLibrary, phase_type: PhaseType) -> String {
    let focus = &prompts.document(phase_type).focus_area;
    if !focus.is_empty() {
        return focus.clone();
    }
    match phase_type {
        PhaseType::History => "taking the patient's history",
        PhaseType::Physical => "the physical examination",
        PhaseType::Testing => "choosing and interpreting diagnostic tests",
        PhaseType::Management => "planning the patient's management",
        PhaseType::Discussion => "discussing the case and its learning points",
    }
    .to_string()
}

/// Learner-facing redirect for an off-topic message.
pub fn redirect_message(redirect_type: RedirectType, topic: &str, current_phase_focus: &str) -> String {
    let template = match redirect_type {
        RedirectType::Gentle => {
            "That's an interesting thought about {topic}, but let's stay with \
             {current_phase_focus} for now. What else would you like to know?"
        }
        RedirectType::Educational => {
            "Questions about {topic} matter, but they belong to a different part of \
             the case. Right now we're focused on {current_phase_focus}. What would you \
             ask next?"
        }
        RedirectType::Direct | RedirectType::None => {
            "Let's keep the discussion on the patient in front of us. We're currently \
             focused on {current_phase_focus}."
        }
    };
    template
        .replace("{topic}", topic)
        .replace("{current_phase_focus}", current_phase_focus)
}

/// A question nudging the learner toward the first missing element.
pub fn probe_question(missing: &[ClinicalElement]) -> Option<String> {
    missing
        .first()
        .map(|element| format!("Can you tell me more about {}?", element.content))
}

/// A synthesis question for when nothing required is missing.
pub fn follow_up_question(phase_type: PhaseType) -> &'static str {
    match phase_type {
        PhaseType::History => {
            "Based on the history so far, what are your leading diagnoses and why?"
        }
        PhaseType::Physical => "How do the examination findings change your differential?",
        PhaseType::Testing => {
            "Which results are most useful in confirming or excluding your leading diagnosis?"
        }
        PhaseType::Management => "How would you monitor this patient's response to treatment?",
        PhaseType::Discussion => "What is the key learning point you will take from this case?",
    }
}

/// `ROLE: content` lines for judgment prompts.
pub fn format_transcript(messages: &[ChatMessage]) -> String {
    if !messages.iter().any(|m| m.role == ChatRole::User) {
        return EMPTY_TRANSCRIPT_PLACEHOLDER.to_string();
    }
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str().to_uppercase(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The message that opens a case.
pub fn case_presentation(case: &CaseData) -> String {
    format!("Case presentation: {}", case.metadata.title)
}

/// The assistant message that opens a phase: the phase introduction, if
/// any, followed by its opening prompt.
pub fn phase_opening(prompts: &PromptLibrary, phase: &Phase) -> String {
    let introduction = &prompts.document(phase.phase_type).introduction;
    if introduction.is_empty() {
        phase.config.opening_prompt.clone()
    } else {
        format!("{introduction}\n\n{}", phase.config.opening_prompt)
    }
}
