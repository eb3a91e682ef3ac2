use std::future::Future;
use std::pin::Pin;

use rounds_core::models::transcript::ChatMessage;

use crate::error::BedrockError;

/// Sampling temperature used when a caller has no reason to pick another.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A text-generation collaborator that can answer two shapes of request.
///
/// Each call is independent: nothing carries over between calls apart from
/// what the caller passes in. Failures come back as `Err`; deciding what a
/// failure means is left to the caller.
///
/// Methods return boxed futures for dyn compatibility.
pub trait Judge: Send + Sync {
    /// Structured judgment: system instruction + user content → JSON object.
    fn judge_json<'a>(
        &'a self,
        system_prompt: &'a str,
        user_message: &'a str,
        temperature: f32,
    ) -> BoxFuture<'a, Result<serde_json::Value, BedrockError>>;

    /// Conversational reply: system instruction + prior messages + new user
    /// content → free text.
    fn converse<'a>(
        &'a self,
        system_prompt: &'a str,
        history: &'a [ChatMessage],
        user_message: &'a str,
        temperature: f32,
    ) -> BoxFuture<'a, Result<String, BedrockError>>;
}
