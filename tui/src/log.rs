//! The activity log: timestamped, tagged lines built from agent events.

use std::collections::{HashMap, VecDeque};

use chrono::{Local, NaiveTime};
use nexus_engine::{ActionStatus, AgentEvent, AgentState};
use nexus_types::{ToolCategory, sanitize_terminal_text};

use crate::theme::LogTag;

const MAX_ENTRIES: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub time: NaiveTime,
    pub sender: String,
    pub tag: LogTag,
    pub text: String,
}

impl LogEntry {
    /// `[HH:MM:SS] SENDER: `
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("[{}] {}: ", self.time.format("%H:%M:%S"), self.sender)
    }
}

/// Bounded log; the oldest lines fall off first.
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
}

impl ActivityLog {
    pub fn push(&mut self, sender: &str, tag: LogTag, text: &str) {
        self.push_at(Local::now().time(), sender, tag, text);
    }

    pub fn push_at(&mut self, time: NaiveTime, sender: &str, tag: LogTag, text: &str) {
        if self.entries.len() == MAX_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            time,
            sender: sender.to_string(),
            tag,
            text: sanitize_terminal_text(text).into_owned(),
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

fn category_sender(category: Option<ToolCategory>) -> &'static str {
    match category {
        Some(ToolCategory::Files) => "FILE",
        Some(ToolCategory::Web) => "WEB",
        Some(ToolCategory::Reminders) => "NOTE",
        Some(ToolCategory::Screen) => "SCREEN",
        _ => "ACTION",
    }
}

/// How an event appears in the log, if at all.
///
/// `categories` maps tool names to their category so results are labelled
/// `FILE`, `WEB` and so on.
#[must_use]
pub fn describe_event(
    event: &AgentEvent,
    categories: &HashMap<String, ToolCategory>,
) -> Option<(&'static str, LogTag, String)> {
    match event {
        AgentEvent::Heard(text) => Some(("USER", LogTag::User, text.clone())),
        AgentEvent::Spoke(text) => Some(("NEXUS", LogTag::Assistant, text.clone())),
        AgentEvent::ActionResult(outcome) => match outcome.status {
            // Already logged through the spoken line.
            ActionStatus::Replied => None,
            ActionStatus::Succeeded => Some((
                category_sender(categories.get(&outcome.tool).copied()),
                LogTag::Action,
                outcome.result.clone(),
            )),
            ActionStatus::Failed | ActionStatus::UnknownTool | ActionStatus::Errored => {
                Some(("ERROR", LogTag::Error, outcome.result.clone()))
            }
        },
        AgentEvent::ReminderDue(message) => Some(("REMINDER", LogTag::Action, message.clone())),
        AgentEvent::Error(message) => Some(("ERROR", LogTag::Error, message.clone())),
        AgentEvent::Status(AgentState::Listening) => {
            Some(("STATUS", LogTag::Status, "Listening for command...".to_string()))
        }
        AgentEvent::Status(AgentState::Thinking) => {
            Some(("STATUS", LogTag::Status, "Processing command...".to_string()))
        }
        AgentEvent::Status(_) => None,
        AgentEvent::Stopped => Some(("SYSTEM", LogTag::System, "Agent stopped.".to_string())),
    }
}
