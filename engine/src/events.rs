//! Messages between the agent task and its front ends.

use std::fmt;

/// What the agent is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentState {
    #[default]
    Idle,
    Listening,
    Thinking,
    Executing,
}

impl AgentState {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            AgentState::Idle => "IDLE",
            AgentState::Listening => "LISTENING",
            AgentState::Thinking => "THINKING",
            AgentState::Executing => "EXECUTING",
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a dispatched action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    /// A `response` action: the text was spoken.
    Replied,
    Succeeded,
    /// The skill reported a problem the user can act on.
    Failed,
    UnknownTool,
    /// Bad arguments, timeout or a crashed skill.
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub tool: String,
    pub result: String,
    pub status: ActionStatus,
}

impl ActionOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, ActionStatus::Replied | ActionStatus::Succeeded)
    }
}

/// Requests from an interactive front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentCommand {
    /// A typed command, handled like a transcribed one.
    Submit(String),
    /// Pause or resume the microphone.
    SetListening(bool),
    ClearHistory,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    Status(AgentState),
    Heard(String),
    Spoke(String),
    ActionResult(ActionOutcome),
    ReminderDue(String),
    Error(String),
    Stopped,
}
