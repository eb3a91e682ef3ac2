//! JSON extraction from model replies.
//!
//! The Converse API has no JSON response mode, so the system prompt asks for
//! JSON and the reply is cleaned up here. Models sometimes wrap the object in
//! a Markdown code fence or add a sentence before it.

use crate::error::BedrockError;

/// Instruction appended to every structured-judgment system prompt.
pub const JSON_INSTRUCTION: &str = "Please respond in JSON format with a single JSON object and nothing else.";

/// Parse the first JSON object out of a model reply.
///
/// Returns [`BedrockError::ResponseParse`] when no JSON can be found and
/// [`BedrockError::SchemaViolation`] when the JSON is not an object.
pub fn parse_json_object(text: &str) -> Result<serde_json::Value, BedrockError> {
    let body = strip_code_fence(text.trim());

    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => {
            let slice = outermost_braces(body).ok_or_else(|| {
                BedrockError::ResponseParse(format!("no JSON object in response: {text}"))
            })?;
            serde_json::from_str(slice).map_err(|e| {
                BedrockError::ResponseParse(format!("invalid JSON in response: {e}"))
            })?
        }
    };

    if !value.is_object() {
        return Err(BedrockError::SchemaViolation(format!(
            "expected a JSON object, got: {value}"
        )));
    }

    Ok(value)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

fn outermost_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
