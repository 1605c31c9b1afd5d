//! The listen, think, act loop.

use nexus_types::Action;
use nexus_voice::{Heard, Listener};
use tokio::sync::mpsc;

use crate::brain::Brain;
use crate::dispatch::Dispatcher;
use crate::events::{ActionOutcome, AgentCommand, AgentEvent, AgentState};
use crate::narrator::Narrator;
use crate::reminders::ReminderChecker;

pub const GOODBYE: &str = "Shutting down. Goodbye.";
pub const SHUTDOWN: &str = "Shutting down.";
pub const LISTENER_ERROR_REPLY: &str = "I encountered an error.";

/// Phrases that end the session when heard anywhere in an utterance.
const EXIT_PHRASES: &[&str] = &["exit", "stop listening"];

#[must_use]
pub fn is_exit_command(text: &str) -> bool {
    let text = text.to_lowercase();
    EXIT_PHRASES.iter().any(|phrase| text.contains(phrase))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

pub struct Agent {
    brain: Brain,
    dispatcher: Dispatcher,
    narrator: Narrator,
    reminders: ReminderChecker,
    listener: Option<Box<dyn Listener>>,
    commands: Option<mpsc::UnboundedReceiver<AgentCommand>>,
    greeting: String,
    listening: bool,
    exit_on_input_closed: bool,
}

impl Agent {
    #[must_use]
    pub fn new(
        brain: Brain,
        dispatcher: Dispatcher,
        narrator: Narrator,
        reminders: ReminderChecker,
    ) -> Self {
        Self {
            brain,
            dispatcher,
            narrator,
            reminders,
            listener: None,
            commands: None,
            greeting: String::new(),
            listening: true,
            exit_on_input_closed: false,
        }
    }

    #[must_use]
    pub fn with_listener(mut self, listener: Box<dyn Listener>) -> Self {
        self.listener = Some(listener);
        self
    }

    #[must_use]
    pub fn with_commands(mut self, commands: mpsc::UnboundedReceiver<AgentCommand>) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Stop when the listener closes even though a command channel is still
    /// attached. The console keeps a channel only to deliver Ctrl-C.
    #[must_use]
    pub fn exit_when_input_closes(mut self) -> Self {
        self.exit_on_input_closed = true;
        self
    }

    #[must_use]
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    #[must_use]
    pub fn brain(&self) -> &Brain {
        &self.brain
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn set_state(&self, state: AgentState) {
        self.narrator.emit(AgentEvent::Status(state));
    }

    /// One think, act turn without the exit check. Used by `ask` and by the
    /// loop itself.
    pub async fn turn(&mut self, text: &str) -> Vec<ActionOutcome> {
        self.set_state(AgentState::Thinking);
        let actions: Vec<Action> = self.brain.think(text).await;

        self.set_state(AgentState::Executing);
        let mut outcomes = Vec::with_capacity(actions.len());
        for action in &actions {
            let outcome = self.dispatcher.execute(action).await;
            self.narrator.emit(AgentEvent::ActionResult(outcome.clone()));
            outcomes.push(outcome);
        }
        self.set_state(AgentState::Idle);
        outcomes
    }

    async fn handle_utterance(&mut self, text: String) -> Flow {
        tracing::info!(text = %text, "Heard");
        self.narrator.emit(AgentEvent::Heard(text.clone()));
        if is_exit_command(&text) {
            self.narrator.say(GOODBYE).await;
            return Flow::Stop;
        }
        self.turn(&text).await;
        Flow::Continue
    }

    async fn handle_command(&mut self, command: AgentCommand) -> Flow {
        match command {
            AgentCommand::Submit(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    return Flow::Continue;
                }
                self.handle_utterance(text).await
            }
            AgentCommand::SetListening(listening) => {
                tracing::info!(listening, "Microphone toggled");
                self.listening = listening;
                Flow::Continue
            }
            AgentCommand::ClearHistory => {
                self.brain.clear_history();
                tracing::info!("Conversation history cleared");
                Flow::Continue
            }
            AgentCommand::Shutdown => {
                self.narrator.say(SHUTDOWN).await;
                Flow::Stop
            }
        }
    }

    async fn handle_heard(&mut self, heard: Result<Heard, nexus_voice::VoiceError>) -> Flow {
        match heard {
            Ok(Heard::Speech(text)) => self.handle_utterance(text).await,
            Ok(Heard::Nothing) => {
                self.set_state(AgentState::Idle);
                Flow::Continue
            }
            Ok(Heard::Closed) => {
                tracing::info!("Input closed");
                self.listener = None;
                if self.commands.is_some() && !self.exit_on_input_closed {
                    Flow::Continue
                } else {
                    Flow::Stop
                }
            }
            Err(e) => {
                tracing::error!("Listener error: {e}");
                self.narrator.emit(AgentEvent::Error(e.to_string()));
                self.narrator.say(LISTENER_ERROR_REPLY).await;
                self.set_state(AgentState::Idle);
                Flow::Continue
            }
        }
    }

    /// Greet, start the reminder checker and serve until an exit phrase, a
    /// shutdown command, or both input sources close.
    pub async fn run(mut self) {
        self.narrator.say(&self.greeting).await;
        self.reminders.start();
        self.set_state(AgentState::Idle);

        loop {
            let listen = self.listening && self.listener.is_some();
            if listen {
                self.set_state(AgentState::Listening);
            }

            let step = match (listen, self.commands.as_mut(), self.listener.as_mut()) {
                (true, Some(commands), Some(listener)) => tokio::select! {
                    command = commands.recv() => Step::Command(command),
                    heard = listener.listen() => Step::Heard(heard),
                },
                (true, None, Some(listener)) => Step::Heard(listener.listen().await),
                (_, Some(commands), _) => Step::Command(commands.recv().await),
                _ => break,
            };

            let flow = match step {
                Step::Command(Some(command)) => self.handle_command(command).await,
                Step::Command(None) => {
                    tracing::debug!("Command channel closed");
                    self.commands = None;
                    Flow::Continue
                }
                Step::Heard(heard) => self.handle_heard(heard).await,
            };
            if flow == Flow::Stop {
                break;
            }
        }

        self.reminders.stop();
        self.set_state(AgentState::Idle);
        self.narrator.emit(AgentEvent::Stopped);
        tracing::info!("Agent stopped");
    }
}

enum Step {
    Command(Option<AgentCommand>),
    Heard(Result<Heard, nexus_voice::VoiceError>),
}
