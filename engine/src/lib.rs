//! Nexus engine: the think, act loop around the skill registry.
//!
//! - [`Brain`] keeps the bounded conversation and turns an utterance into
//!   [`Action`](nexus_types::Action)s through a [`ChatModel`](nexus_providers::ChatModel).
//! - [`Dispatcher`] runs each action against the tool registry and decides
//!   what gets spoken.
//! - [`Agent`] drives listen, think, act, reporting progress as
//!   [`AgentEvent`]s and taking [`AgentCommand`]s from interactive front ends.
//! - [`ReminderChecker`] announces due reminders in the background.

mod agent;
mod brain;
mod dispatch;
mod events;
mod narrator;
mod prompt;
mod reminders;
mod setup;

#[cfg(test)]
mod testing;

pub use agent::{Agent, GOODBYE, LISTENER_ERROR_REPLY, SHUTDOWN, is_exit_command};
pub use brain::{Brain, FORMAT_ERROR_REPLY, MISSING_MODEL_REPLY};
pub use dispatch::{Dispatcher, TOOL_ERROR_REPLY, UNKNOWN_TOOL_REPLY};
pub use events::{ActionOutcome, ActionStatus, AgentCommand, AgentEvent, AgentState};
pub use narrator::Narrator;
pub use prompt::system_prompt;
pub use reminders::ReminderChecker;
pub use setup::{AgentParts, EngineError, assemble, registry_from_config};
