//! Dashboard state: the activity log, the input line and the agent link.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use nexus_engine::{AgentCommand, AgentEvent, AgentState};
use nexus_types::ToolCategory;
use tokio::sync::{mpsc, watch};

use crate::log::{ActivityLog, describe_event};
use crate::stats::Stats;
use crate::theme::LogTag;

/// Events applied per frame; the rest wait for the next one.
const MAX_AGENT_EVENTS_PER_FRAME: usize = 64;
const SCROLL_STEP: usize = 5;

pub struct App {
    name: String,
    categories: HashMap<String, ToolCategory>,
    log: ActivityLog,
    input: String,
    state: AgentState,
    online: bool,
    voice: bool,
    listening: bool,
    scroll: usize,
    stats: Stats,
    stats_rx: Option<watch::Receiver<Stats>>,
    commands: mpsc::UnboundedSender<AgentCommand>,
    events: mpsc::UnboundedReceiver<AgentEvent>,
    should_quit: bool,
}

impl App {
    /// `categories` maps each registered tool to its category; `voice`
    /// says whether a microphone listener is attached.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        categories: HashMap<String, ToolCategory>,
        voice: bool,
        commands: mpsc::UnboundedSender<AgentCommand>,
        events: mpsc::UnboundedReceiver<AgentEvent>,
    ) -> Self {
        let mut app = Self {
            name: name.into(),
            categories,
            log: ActivityLog::default(),
            input: String::new(),
            state: AgentState::Idle,
            online: true,
            voice,
            listening: voice,
            scroll: 0,
            stats: Stats::default(),
            stats_rx: None,
            commands,
            events,
            should_quit: false,
        };
        let ready = format!("{} initialized. {} tools loaded.", app.name, app.tool_count());
        app.log.push("SYSTEM", LogTag::System, &ready);
        if !voice {
            app.log.push("SYSTEM", LogTag::System, "Voice input unavailable. Type commands below.");
        }
        app
    }

    #[must_use]
    pub fn with_stats(mut self, stats: watch::Receiver<Stats>) -> Self {
        self.stats_rx = Some(stats);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn tool_count(&self) -> usize {
        self.categories.len()
    }

    #[must_use]
    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[must_use]
    pub fn state(&self) -> AgentState {
        self.state
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online
    }

    #[must_use]
    pub fn has_voice(&self) -> bool {
        self.voice
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Lines scrolled back from the newest entry.
    #[must_use]
    pub fn scroll(&self) -> usize {
        self.scroll
    }

    #[must_use]
    pub fn stats(&self) -> Stats {
        self.stats
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn send(&mut self, command: AgentCommand) {
        if self.commands.send(command).is_err() {
            self.online = false;
        }
    }

    pub fn submit(&mut self) {
        let text = self.input.trim().to_string();
        self.input.clear();
        if text.is_empty() {
            return;
        }
        if !self.online {
            self.log.push("ERROR", LogTag::Error, "Agent is offline.");
            return;
        }
        self.scroll = 0;
        self.send(AgentCommand::Submit(text));
    }

    pub fn toggle_listening(&mut self) {
        if !self.voice {
            self.log.push("SYSTEM", LogTag::System, "No microphone available.");
            return;
        }
        self.listening = !self.listening;
        self.send(AgentCommand::SetListening(self.listening));
        let text = if self.listening { "Microphone on." } else { "Microphone muted." };
        self.log.push("SYSTEM", LogTag::System, text);
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
        self.scroll = 0;
    }

    pub fn clear_history(&mut self) {
        self.send(AgentCommand::ClearHistory);
        self.log.push("SYSTEM", LogTag::System, "Conversation history cleared.");
    }

    pub fn request_quit(&mut self) {
        if self.online {
            self.send(AgentCommand::Shutdown);
        }
        self.should_quit = true;
    }

    pub fn enter_text(&mut self, text: &str) {
        let text = text.replace("\r\n", "\n");
        self.input
            .extend(text.chars().map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c }));
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => self.request_quit(),
            KeyCode::Char('l') if ctrl => self.clear_log(),
            KeyCode::Char('r') if ctrl => self.clear_history(),
            KeyCode::Esc => self.request_quit(),
            KeyCode::Enter => self.submit(),
            KeyCode::F(2) => self.toggle_listening(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_add(SCROLL_STEP);
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_sub(SCROLL_STEP);
            }
            KeyCode::End => self.scroll = 0,
            KeyCode::Char(c) if !ctrl => self.input.push(c),
            _ => {}
        }
    }

    /// Clamp scrolling to what the log panel can show.
    pub fn clamp_scroll(&mut self, max: usize) {
        self.scroll = self.scroll.min(max);
    }

    pub fn apply_event(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::Status(state) => self.state = *state,
            AgentEvent::Stopped => {
                self.online = false;
                self.state = AgentState::Idle;
            }
            _ => {}
        }
        if let Some((sender, tag, text)) = describe_event(event, &self.categories) {
            self.log.push(sender, tag, &text);
        }
    }

    /// Drain pending agent events and pick up the latest stats sample.
    pub fn tick(&mut self) {
        for _ in 0..MAX_AGENT_EVENTS_PER_FRAME {
            match self.events.try_recv() {
                Ok(event) => self.apply_event(&event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.online = false;
                    break;
                }
            }
        }
        if let Some(rx) = self.stats_rx.as_mut()
            && rx.has_changed().unwrap_or(false)
        {
            self.stats = *rx.borrow_and_update();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;
    use nexus_engine::{ActionOutcome, ActionStatus};

    pub(crate) fn app(
        voice: bool,
    ) -> (App, mpsc::UnboundedReceiver<AgentCommand>, mpsc::UnboundedSender<AgentEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let categories = HashMap::from([
            ("get_time".to_string(), ToolCategory::Hardware),
            ("read_file".to_string(), ToolCategory::Files),
        ]);
        (App::new("Nexus", categories, voice, command_tx, event_rx), command_rx, event_tx)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, KeyEventKind::Press)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn startup_lines() {
        let (app, _, _) = app(false);
        let texts: Vec<&str> = app.log().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Nexus initialized. 2 tools loaded.",
                "Voice input unavailable. Type commands below."
            ]
        );
    }

    #[test]
    fn enter_submits_trimmed_text() {
        let (mut app, mut commands, _) = app(true);
        type_text(&mut app, "  whats the time ");
        app.handle_key(key(KeyCode::Backspace));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(
            commands.try_recv().unwrap(),
            AgentCommand::Submit("whats the time".to_string())
        );
        assert!(app.input().is_empty());

        app.handle_key(key(KeyCode::Enter));
        assert!(commands.try_recv().is_err());
    }

    #[test]
    fn f2_toggles_microphone() {
        let (mut app, mut commands, _) = app(true);
        app.handle_key(key(KeyCode::F(2)));
        assert_eq!(commands.try_recv().unwrap(), AgentCommand::SetListening(false));
        assert!(!app.is_listening());

        let (mut silent, mut commands, _) = super::tests::app(false);
        silent.handle_key(key(KeyCode::F(2)));
        assert!(commands.try_recv().is_err());
    }

    #[test]
    fn control_keys() {
        let (mut app, mut commands, _) = app(true);
        app.handle_key(ctrl('l'));
        assert!(app.log().is_empty());

        app.handle_key(ctrl('r'));
        assert_eq!(commands.try_recv().unwrap(), AgentCommand::ClearHistory);

        app.handle_key(ctrl('c'));
        assert_eq!(commands.try_recv().unwrap(), AgentCommand::Shutdown);
        assert!(app.should_quit());
    }

    #[test]
    fn events_update_state_and_log() {
        let (mut app, _, events) = app(true);
        app.clear_log();
        events.send(AgentEvent::Status(AgentState::Thinking)).unwrap();
        events.send(AgentEvent::Heard("read notes.txt".to_string())).unwrap();
        events
            .send(AgentEvent::ActionResult(ActionOutcome {
                tool: "read_file".to_string(),
                result: "Contents".to_string(),
                status: ActionStatus::Succeeded,
            }))
            .unwrap();
        app.tick();

        assert_eq!(app.state(), AgentState::Thinking);
        let senders: Vec<&str> = app.log().iter().map(|e| e.sender.as_str()).collect();
        assert_eq!(senders, vec!["STATUS", "USER", "FILE"]);

        events.send(AgentEvent::Stopped).unwrap();
        app.tick();
        assert!(!app.is_online());
    }

    #[test]
    fn offline_agent_rejects_input() {
        let (mut app, commands, _) = app(true);
        drop(commands);
        type_text(&mut app, "hello");
        app.handle_key(key(KeyCode::Enter));
        assert!(!app.is_online());

        type_text(&mut app, "again");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.log().iter().last().unwrap().text, "Agent is offline.");
    }

    #[test]
    fn paste_flattens_newlines() {
        let (mut app, _, _) = app(true);
        app.enter_text("open\nchrome");
        assert_eq!(app.input(), "open chrome");
    }
}
