//! Core domain types for Nexus.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod action;
mod message;
mod sanitize;

pub use action::{Action, ActionParseError, normalize_actions, parse_model_reply};
pub use message::{ChatHistory, ChatMessage, Role};
pub use sanitize::sanitize_terminal_text;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Credentials and model selection
// ============================================================================

/// Groq API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for blank keys so "configured but empty" reads as missing.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey(<redacted>)")
    }
}

/// Chat model identifier sent to the completions endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelName(String);

impl ModelName {
    pub const DEFAULT: &'static str = "llama-3.3-70b-versatile";

    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.trim().is_empty() {
            Self::default()
        } else {
            Self(name.trim().to_string())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ModelName {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl std::fmt::Display for ModelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Tool catalog
// ============================================================================

/// Grouping used when presenting tools to the model and the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolCategory {
    Communication,
    Applications,
    Hardware,
    Files,
    Web,
    Reminders,
    Screen,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 7] = [
        ToolCategory::Communication,
        ToolCategory::Applications,
        ToolCategory::Hardware,
        ToolCategory::Files,
        ToolCategory::Web,
        ToolCategory::Reminders,
        ToolCategory::Screen,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            ToolCategory::Communication => "COMMUNICATION",
            ToolCategory::Applications => "APPLICATIONS & WEB",
            ToolCategory::Hardware => "SYSTEM HARDWARE",
            ToolCategory::Files => "FILE MANAGEMENT",
            ToolCategory::Web => "WEB & INFORMATION",
            ToolCategory::Reminders => "REMINDERS & NOTES",
            ToolCategory::Screen => "SCREENSHOTS & CLIPBOARD",
        }
    }
}

/// A tool as advertised in the system prompt.
///
/// `arguments` is an example argument object (`{"app_name": "Name"}`), not a
/// JSON schema: the model is shown the literal call shape it should emit.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    pub arguments: Value,
}

impl ToolDefinition {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: ToolCategory,
        arguments: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category,
            arguments,
        }
    }

    /// Render the call shape, e.g. `{ "tool": "open_app", "app_name": "Name" }`.
    #[must_use]
    pub fn call_shape(&self) -> String {
        let mut shape = format!("{{ \"tool\": \"{}\"", self.name);
        if let Value::Object(map) = &self.arguments {
            for (key, value) in map {
                shape.push_str(&format!(", \"{key}\": {value}"));
            }
        }
        shape.push_str(" }");
        shape
    }
}
