//! Wiring an [`Agent`] from configuration.

use std::sync::Arc;
use std::time::Duration;

use nexus_config::NexusConfig;
use nexus_providers::ChatModel;
use nexus_tools::{Os, ToolCtx, ToolError, ToolRegistry, builtin_registry};
use nexus_types::ChatHistory;
use nexus_voice::Speaker;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::agent::Agent;
use crate::brain::Brain;
use crate::dispatch::Dispatcher;
use crate::events::AgentEvent;
use crate::narrator::Narrator;
use crate::prompt::system_prompt;
use crate::reminders::ReminderChecker;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to build tool registry: {0}")]
    Registry(#[from] ToolError),
}

/// Runtime pieces the front end chooses; everything else comes from config.
pub struct AgentParts {
    pub model: Option<Arc<dyn ChatModel>>,
    pub ctx: ToolCtx,
    pub speaker: Arc<dyn Speaker>,
    pub events: Option<mpsc::UnboundedSender<AgentEvent>>,
}

/// The registry with `[tools] disabled` applied.
pub fn registry_from_config(config: &NexusConfig) -> Result<ToolRegistry, EngineError> {
    Ok(builtin_registry(&config.tools().disabled)?)
}

pub fn assemble(config: &NexusConfig, parts: AgentParts) -> Result<Agent, EngineError> {
    let registry = Arc::new(registry_from_config(config)?);
    let brain_config = config.brain();
    let prompt = system_prompt(&config.name(), Os::current(), &registry);
    let history = ChatHistory::with_limits(prompt, brain_config.history_limit, brain_config.history_keep);

    let mut narrator = Narrator::new(parts.speaker);
    if let Some(events) = parts.events {
        narrator = narrator.with_events(events);
    }

    let tools = config.tools();
    let dispatcher = Dispatcher::new(
        registry,
        parts.ctx.clone(),
        narrator.clone(),
        Duration::from_secs(tools.timeout_seconds.max(1)),
    );
    let reminders = ReminderChecker::new(
        parts.ctx.reminders.clone(),
        narrator.clone(),
        Duration::from_secs(config.reminders().poll_seconds),
    );
    tracing::info!(
        tools = dispatcher.registry().len(),
        model = parts.model.as_ref().map_or("none", |m| m.model_name()),
        "Agent assembled"
    );

    Ok(Agent::new(Brain::new(parts.model, history), dispatcher, narrator, reminders)
        .with_greeting(config.greeting()))
}
