//! Chat messages and the bounded conversation memory.
//!
//! The history is sent verbatim to the chat completions endpoint on every
//! turn, so its size is capped: once it grows past `max_messages` it collapses
//! to the system prompt plus the most recent `keep_recent` messages.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sliding-window conversation memory anchored by a system prompt.
///
/// Invariant: `messages[0]` is always the system message.
#[derive(Debug, Clone)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
    max_messages: usize,
    keep_recent: usize,
}

impl ChatHistory {
    pub const DEFAULT_MAX_MESSAGES: usize = 12;
    pub const DEFAULT_KEEP_RECENT: usize = 10;

    #[must_use]
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self::with_limits(
            system_prompt,
            Self::DEFAULT_MAX_MESSAGES,
            Self::DEFAULT_KEEP_RECENT,
        )
    }

    /// Limits are clamped so that `1 <= keep_recent < max_messages`.
    #[must_use]
    pub fn with_limits(
        system_prompt: impl Into<String>,
        max_messages: usize,
        keep_recent: usize,
    ) -> Self {
        let max_messages = max_messages.max(2);
        let keep_recent = keep_recent.clamp(1, max_messages - 1);
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
            max_messages,
            keep_recent,
        }
    }

    /// Append a user turn, collapsing the window when it overflows.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
        if self.messages.len() > self.max_messages {
            let tail_start = self.messages.len() - self.keep_recent;
            self.messages.drain(1..tail_start);
        }
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.messages[0].content
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.messages[0] = ChatMessage::system(prompt);
    }

    /// Forget every turn but keep the system prompt.
    pub fn clear(&mut self) {
        self.messages.truncate(1);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when only the system prompt is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.len() <= 1
    }

    #[must_use]
    pub fn limits(&self) -> (usize, usize) {
        (self.max_messages, self.keep_recent)
    }
}
