//! Skill executor framework - core types, the registry and every built-in skill.
//!
//! Each skill is a [`ToolExecutor`]. The engine looks the model's requested
//! tool name up in a [`ToolRegistry`] and runs it against a shared
//! [`ToolCtx`], which carries the data directory, HTTP client, desktop
//! platform, clipboard and reminder store.

pub mod browser;
pub mod clipboard;
pub mod files;
pub mod hardware;
pub mod notes;
pub mod platform;
pub mod process;
pub mod reminders;
pub mod screen;
pub mod system;
pub mod web;
pub mod whatsapp;

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use nexus_config::{FilesConfig, WebConfig};
use nexus_types::{ToolCategory, ToolDefinition};
use serde_json::{Value, json};

pub use clipboard::{ClipboardAccess, MemoryClipboard, SystemClipboard};
pub use platform::{CommandOutput, CommandSpec, DesktopPlatform, Os, RecordingPlatform, SystemPlatform};
pub use reminders::{Reminder, ReminderStore, parse_time_phrase};

/// Tool execution future type alias.
pub type ToolFut<'a> = Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'a>>;

/// Name of the schema-only reply tool intercepted by the engine.
pub const RESPONSE_TOOL: &str = "response";

/// Error types for tool execution.
///
/// The first group is user-facing: the engine speaks the message as-is. The
/// second group are internal faults reported with a generic apology.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Error {context}: {message}")]
    Failed {
        context: &'static str,
        message: String,
    },
    #[error("{0}")]
    Unavailable(String),
    #[error("{operation} is not supported on {os}.")]
    Unsupported { operation: &'static str, os: Os },

    #[error("Bad tool args: {message}")]
    BadArgs { message: String },
    #[error("Tool timed out: {tool}")]
    Timeout { tool: String, elapsed: Duration },
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },
    #[error("Duplicate tool registered: {name}")]
    DuplicateTool { name: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    pub(crate) fn failed(context: &'static str, err: impl std::fmt::Display) -> Self {
        ToolError::Failed {
            context,
            message: err.to_string(),
        }
    }

    /// Whether the message is meant to be spoken to the user verbatim.
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            ToolError::Failed { .. } | ToolError::Unavailable(_) | ToolError::Unsupported { .. }
        )
    }
}

/// How the engine voices a successful result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSpeech {
    /// Speak the result text.
    Full,
    /// The announcement was enough.
    Silent,
    /// Speak a fixed acknowledgement instead of the result.
    Phrase(&'static str),
}

pub trait ToolExecutor: Send + Sync {
    fn name(&self) -> &'static str;
    fn category(&self) -> ToolCategory;
    fn description(&self) -> &'static str;
    /// Example argument object shown to the model.
    fn arguments(&self) -> Value {
        json!({})
    }
    /// Spoken before the tool runs ("Opening Spotify").
    fn announcement(&self, _args: &Value) -> Option<String> {
        None
    }
    fn result_speech(&self) -> ResultSpeech {
        ResultSpeech::Full
    }
    fn is_side_effecting(&self) -> bool;
    /// Overrides the engine's default per-tool timeout.
    fn timeout(&self) -> Option<Duration> {
        None
    }
    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a>;
}

pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(args: &Value) -> Result<T, ToolError> {
    let args = if args.is_null() { &json!({}) } else { args };
    serde_json::from_value(args.clone()).map_err(|e| ToolError::BadArgs {
        message: e.to_string(),
    })
}

/// Accept `5`, `5.0` or `"5"` where the model was asked for an integer.
pub(crate) fn lenient_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a string argument the way the model tends to send it: missing is empty.
pub(crate) fn str_field<'a>(args: &'a Value, key: &str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Tool registry for executors and schema-only tools.
///
/// Schema-only tools are shown to the model but their execution is
/// intercepted by the engine before reaching an executor.
#[derive(Default)]
pub struct ToolRegistry {
    executors: Vec<Box<dyn ToolExecutor>>,
    index: HashMap<String, usize>,
    schema_only: Vec<ToolDefinition>,
}

impl ToolRegistry {
    pub fn register(&mut self, executor: Box<dyn ToolExecutor>) -> Result<(), ToolError> {
        let name = executor.name().to_string();
        if self.index.contains_key(&name) || self.is_schema_only(&name) {
            return Err(ToolError::DuplicateTool { name });
        }
        self.index.insert(name, self.executors.len());
        self.executors.push(executor);
        Ok(())
    }

    pub fn register_schema(&mut self, def: ToolDefinition) -> Result<(), ToolError> {
        let name = &def.name;
        if self.index.contains_key(name) || self.is_schema_only(name) {
            return Err(ToolError::DuplicateTool { name: name.clone() });
        }
        self.schema_only.push(def);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&dyn ToolExecutor, ToolError> {
        self.index
            .get(name)
            .map(|&i| self.executors[i].as_ref())
            .ok_or_else(|| ToolError::UnknownTool {
                name: name.to_string(),
            })
    }

    #[must_use]
    pub fn is_schema_only(&self, name: &str) -> bool {
        self.schema_only.iter().any(|d| d.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.executors.len() + self.schema_only.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Schema-only tools first, then executors in registration order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.schema_only
            .iter()
            .cloned()
            .chain(self.executors.iter().map(|exec| {
                ToolDefinition::new(
                    exec.name(),
                    exec.description(),
                    exec.category(),
                    exec.arguments(),
                )
            }))
            .collect()
    }

    /// Definitions grouped by category, in [`ToolCategory::ALL`] order.
    #[must_use]
    pub fn by_category(&self) -> Vec<(ToolCategory, Vec<ToolDefinition>)> {
        let defs = self.definitions();
        ToolCategory::ALL
            .iter()
            .map(|&category| {
                let members: Vec<ToolDefinition> = defs
                    .iter()
                    .filter(|d| d.category == category)
                    .cloned()
                    .collect();
                (category, members)
            })
            .filter(|(_, members)| !members.is_empty())
            .collect()
    }
}

/// The `response` tool: a spoken reply, handled by the engine.
#[must_use]
pub fn response_definition() -> ToolDefinition {
    ToolDefinition::new(
        RESPONSE_TOOL,
        "Verbal response to user.",
        ToolCategory::Communication,
        json!({ "text": "..." }),
    )
}

/// Register every built-in skill except the names in `disabled`.
pub fn builtin_registry(disabled: &[String]) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::default();
    registry.register_schema(response_definition())?;

    let skills: Vec<Box<dyn ToolExecutor>> = whatsapp::skills()
        .into_iter()
        .chain(system::app_skills())
        .chain(browser::skills())
        .chain(hardware::skills())
        .chain(system::clock_skills())
        .chain(hardware::info_skills())
        .chain(system::power_skills())
        .chain(files::skills())
        .chain(web::skills())
        .chain(reminders::skills())
        .chain(notes::skills())
        .chain(screen::skills())
        .collect();

    for skill in skills {
        if disabled.iter().any(|name| name == skill.name()) {
            tracing::debug!(tool = skill.name(), "Skill disabled by config");
            continue;
        }
        registry.register(skill)?;
    }
    Ok(registry)
}

/// Layout of the assistant's data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn reminders_file(&self) -> PathBuf {
        self.root.join("reminders.json")
    }

    #[must_use]
    pub fn notes_dir(&self) -> PathBuf {
        self.root.join("notes")
    }

    #[must_use]
    pub fn screenshots_dir(&self) -> PathBuf {
        self.root.join("screenshots")
    }
}

/// Shared state handed to every skill.
#[derive(Clone)]
pub struct ToolCtx {
    pub paths: DataPaths,
    pub http: reqwest::Client,
    pub web: WebConfig,
    pub files: FilesConfig,
    pub platform: Arc<dyn DesktopPlatform>,
    pub clipboard: Arc<dyn ClipboardAccess>,
    pub reminders: ReminderStore,
}

impl ToolCtx {
    /// Build a context with default web and file settings, loading any
    /// persisted reminders from the data directory.
    #[must_use]
    pub fn new(
        paths: DataPaths,
        platform: Arc<dyn DesktopPlatform>,
        clipboard: Arc<dyn ClipboardAccess>,
    ) -> Self {
        let reminders = ReminderStore::load(paths.reminders_file());
        let web = WebConfig::default();
        Self {
            http: web_client(&web),
            paths,
            web,
            files: FilesConfig::default(),
            platform,
            clipboard,
            reminders,
        }
    }

    #[must_use]
    pub fn with_web(mut self, web: WebConfig) -> Self {
        self.http = web_client(&web);
        self.web = web;
        self
    }

    #[must_use]
    pub fn with_files(mut self, files: FilesConfig) -> Self {
        self.files = files;
        self
    }
}

fn web_client(web: &WebConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("nexus/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(web.timeout_seconds.max(1)))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to build web client: {e}. Using defaults.");
            reqwest::Client::new()
        })
}
