use serde::{Deserialize, Serialize};

/// Role of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// A single message in the tutoring dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: jiff::Timestamp,
    /// The case presentation survives phase transitions.
    #[serde(default)]
    pub is_presentation: bool,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    pub fn presentation(content: impl Into<String>) -> Self {
        Self {
            is_presentation: true,
            ..Self::new(ChatRole::Assistant, content)
        }
    }

    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: jiff::Timestamp::now(),
            is_presentation: false,
        }
    }
}

/// The ordered dialogue for the current phase.
///
/// Append-only, except [`Transcript::truncate_to_presentation`] which a phase
/// transition uses to start the next phase from the case presentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of learner messages recorded so far.
    pub fn exchange_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == ChatRole::User)
            .count()
    }

    pub fn presentation(&self) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.is_presentation)
    }

    /// Drop everything except the case presentation message, if any.
    pub fn truncate_to_presentation(&mut self) {
        self.messages.retain(|m| m.is_presentation);
        self.messages.truncate(1);
    }
}
