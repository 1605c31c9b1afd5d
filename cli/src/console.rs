//! Plain console front end for `run`, `ask` and `tool`.

use std::time::Duration;

use anyhow::Result;
use nexus_engine::{ActionStatus, AgentCommand, AgentEvent, AgentState};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::wiring::Runtime;

const RULE_WIDTH: usize = 60;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

pub fn banner(name: &str, tools: usize, voice: bool) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let input = if voice {
        "Speak a command. Say \"exit\" to quit."
    } else {
        "Type a command and press Enter. Type \"exit\" to quit."
    };
    format!("{rule}\n{name}\n{tools} tools loaded\n{input}\n{rule}")
}

/// Tracks turn boundaries so a separator follows each completed turn.
#[derive(Debug, Default)]
pub struct EventPrinter {
    executing: bool,
}

impl EventPrinter {
    pub fn lines(&mut self, event: &AgentEvent) -> Vec<String> {
        match event {
            AgentEvent::Spoke(text) if !text.is_empty() => vec![format!("Assistant: {text}")],
            AgentEvent::Heard(text) => vec![format!("You: {text}")],
            AgentEvent::ActionResult(outcome) if outcome.status != ActionStatus::Replied => {
                vec![format!("[Result] {}", outcome.result)]
            }
            AgentEvent::ReminderDue(message) => vec![format!("[Reminder] {message}")],
            AgentEvent::Error(message) => vec![format!("[Error] {message}")],
            AgentEvent::Status(AgentState::Executing) => {
                self.executing = true;
                Vec::new()
            }
            AgentEvent::Status(AgentState::Idle) if self.executing => {
                self.executing = false;
                vec!["-".repeat(RULE_WIDTH)]
            }
            _ => Vec::new(),
        }
    }
}

fn spawn_printer(mut events: mpsc::UnboundedReceiver<AgentEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut printer = EventPrinter::default();
        while let Some(event) = events.recv().await {
            for line in printer.lines(&event) {
                println!("{line}");
            }
        }
    })
}

/// Listen, think, act until an exit phrase, end of input or Ctrl-C.
pub async fn run(runtime: &Runtime, force_text: bool) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let printer = spawn_printer(rx);
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (listener, voice) = runtime.console_listener(force_text);
    let agent = runtime
        .agent(runtime.speaker(), Some(tx))?
        .with_listener(listener)
        .with_commands(command_rx)
        .exit_when_input_closes();

    println!(
        "{}",
        banner(&runtime.config.name(), agent.dispatcher().registry().len(), voice)
    );

    let mut task = tokio::spawn(agent.run());
    let finished = tokio::select! {
        result = &mut task => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    let result = match finished {
        Some(result) => result,
        None => {
            tracing::info!("Interrupted");
            let _ = command_tx.send(AgentCommand::Shutdown);
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("Agent did not stop in time");
                    task.abort();
                    Ok(())
                }
            }
        }
    };
    if let Err(e) = result {
        tracing::error!("Agent task failed: {e}");
    }
    drop(command_tx);
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, printer).await;
    Ok(())
}

/// One think, act turn.
pub async fn ask(runtime: &Runtime, text: &str) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let printer = spawn_printer(rx);
    {
        let mut agent = runtime.agent(runtime.speaker(), Some(tx))?;
        println!("You: {text}");
        agent.turn(text).await;
    }
    let _ = printer.await;
    Ok(())
}

/// Run one skill directly, bypassing the model.
pub async fn tool(runtime: &Runtime, name: &str, args: &str) -> Result<bool> {
    let args: Value = serde_json::from_str(args)
        .map_err(|e| anyhow::anyhow!("--args must be a JSON object: {e}"))?;
    if !args.is_object() {
        anyhow::bail!("--args must be a JSON object");
    }
    let agent = runtime.agent(runtime.speaker(), None)?;
    let outcome = agent
        .dispatcher()
        .execute(&nexus_types::Action::new(name, args))
        .await;
    println!("[Result] {}", outcome.result);
    Ok(outcome.is_success())
}

/// Registered tools grouped by category.
pub fn tools(runtime: &Runtime) -> Result<()> {
    let registry = nexus_engine::registry_from_config(&runtime.config)?;
    for (category, defs) in registry.by_category() {
        println!("{}:", category.label());
        for def in defs {
            let marker = match registry.lookup(&def.name) {
                Ok(executor) if executor.is_side_effecting() => "*",
                _ => " ",
            };
            println!("  {marker} {:<24} {}", def.name, def.description);
        }
    }
    println!("\n{} tools (* changes files or system state)", registry.len());
    Ok(())
}
