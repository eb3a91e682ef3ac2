//! [`Judge`] implementation backed by the Bedrock Converse API.
//!
//! # Turn shaping
//!
//! Converse rejects conversations that do not start with a user turn or that
//! contain two consecutive turns from the same role. The tutor transcript
//! starts with the assistant's case presentation and may hold back-to-back
//! assistant messages (presentation followed by the opening prompt), so the
//! history is reshaped by [`build_turns`] before it is sent: consecutive
//! same-role messages are merged and a short user turn is inserted ahead of
//! a leading assistant turn.

use std::sync::Mutex;

use aws_sdk_bedrockruntime::Client;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, InferenceConfiguration, Message, SystemContentBlock,
};
use tracing::{debug, info};

use rounds_core::models::transcript::{ChatMessage, ChatRole};
use rounds_core::models::usage::UsageTally;

use crate::error::BedrockError;
use crate::extract::{self, JSON_INSTRUCTION};
use crate::judge::{BoxFuture, Judge};
use crate::tokens;

/// Placeholder user turn put ahead of a history that opens with the assistant.
pub const SESSION_START_TURN: &str = "(The teaching session begins.)";

/// A Bedrock-backed judge bound to one model.
pub struct BedrockJudge {
    client: Client,
    model_id: String,
    max_tokens: Option<i32>,
    usage: Mutex<UsageTally>,
}

impl BedrockJudge {
    pub fn new(config: &aws_config::SdkConfig, model_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(config),
            model_id: model_id.into(),
            max_tokens: None,
            usage: Mutex::new(UsageTally::default()),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: i32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Tokens and estimated cost across every call made so far.
    pub fn usage(&self) -> UsageTally {
        *self.usage.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Core invocation using the Bedrock Converse API. Returns the reply text.
    async fn invoke(
        &self,
        system_prompt: &str,
        turns: Vec<(ChatRole, String)>,
        temperature: f32,
    ) -> Result<String, BedrockError> {
        let mut messages = Vec::with_capacity(turns.len());
        for (role, content) in turns {
            let role = match role {
                ChatRole::User => ConversationRole::User,
                ChatRole::Assistant => ConversationRole::Assistant,
            };
            let message = Message::builder()
                .role(role)
                .content(ContentBlock::Text(content))
                .build()
                .map_err(|e| BedrockError::Invocation(e.to_string()))?;
            messages.push(message);
        }

        let inference = InferenceConfiguration::builder()
            .temperature(temperature)
            .set_max_tokens(self.max_tokens)
            .build();

        debug!(model = %self.model_id, turns = messages.len(), "invoking converse");

        let response = self
            .client
            .converse()
            .model_id(&self.model_id)
            .system(SystemContentBlock::Text(system_prompt.to_string()))
            .set_messages(Some(messages))
            .inference_config(inference)
            .send()
            .await
            .map_err(|e| BedrockError::Invocation(e.into_service_error().to_string()))?;

        if let Some(usage) = response.usage() {
            let count = tokens::extract_token_usage(usage);
            let cost = tokens::estimate_cost(&self.model_id, count);
            self.usage
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .record(count, cost);
        }

        let output_message = response
            .output()
            .and_then(|o| o.as_message().ok())
            .ok_or_else(|| BedrockError::ResponseParse("no message in response".to_string()))?;

        let text = output_message
            .content()
            .iter()
            .filter_map(|block| {
                if let ContentBlock::Text(text) = block {
                    Some(text.as_str())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");

        Ok(text)
    }
}

impl Judge for BedrockJudge {
    fn judge_json<'a>(
        &'a self,
        system_prompt: &'a str,
        user_message: &'a str,
        temperature: f32,
    ) -> BoxFuture<'a, Result<serde_json::Value, BedrockError>> {
        Box::pin(async move {
            let system = format!("{system_prompt}\n{JSON_INSTRUCTION}");
            let turns = vec![(ChatRole::User, user_message.to_string())];
            let text = self.invoke(&system, turns, temperature).await?;
            let value = extract::parse_json_object(&text)?;
            info!(model = %self.model_id, "structured judgment complete");
            Ok(value)
        })
    }

    fn converse<'a>(
        &'a self,
        system_prompt: &'a str,
        history: &'a [ChatMessage],
        user_message: &'a str,
        temperature: f32,
    ) -> BoxFuture<'a, Result<String, BedrockError>> {
        Box::pin(async move {
            let turns = build_turns(history, user_message);
            let text = self.invoke(system_prompt, turns, temperature).await?;
            info!(
                model = %self.model_id,
                history_len = history.len(),
                "conversational reply complete"
            );
            Ok(text)
        })
    }
}

/// Shape a transcript plus a new user message into alternating turns that
/// start with the user.
pub fn build_turns(history: &[ChatMessage], user_message: &str) -> Vec<(ChatRole, String)> {
    let mut turns: Vec<(ChatRole, String)> = Vec::with_capacity(history.len() + 2);

    let messages = history
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .chain(std::iter::once((ChatRole::User, user_message)));

    for (role, content) in messages {
        match turns.last_mut() {
            Some((last_role, text)) if *last_role == role => {
                text.push_str("\n\n");
                text.push_str(content);
            }
            _ => turns.push((role, content.to_string())),
        }
    }

    if turns.first().is_some_and(|(role, _)| *role == ChatRole::Assistant) {
        turns.insert(0, (ChatRole::User, SESSION_START_TURN.to_string()));
    }

    turns
}
