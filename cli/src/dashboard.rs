//! Full-screen dashboard: terminal lifecycle and the frame loop.

use std::collections::HashMap;
use std::io::{Stdout, Write, stdout};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use nexus_engine::AgentCommand;
use nexus_tui::{App, InputPump, draw, handle_events, spawn_sampler};
use ratatui::prelude::*;
use tokio::sync::mpsc;

use crate::wiring::Runtime;

const FRAME_DURATION: Duration = Duration::from_millis(16);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Raw mode, bracketed paste and the alternate screen for the lifetime of
/// the value; restored on drop, including after a panic unwinds through it.
struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    fn new() -> Result<Self> {
        enable_raw_mode()?;

        let mut out = stdout();
        if let Err(err) = execute!(out, EnableBracketedPaste, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            let _ = execute!(out, LeaveAlternateScreen, DisableBracketedPaste);
            return Err(err.into());
        }

        match Terminal::new(CrosstermBackend::new(out)) {
            Ok(terminal) => Ok(Self { terminal }),
            Err(err) => {
                let _ = disable_raw_mode();
                let _ = execute!(stdout(), LeaveAlternateScreen, DisableBracketedPaste);
                Err(err.into())
            }
        }
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableBracketedPaste
        );
        let _ = Write::flush(self.terminal.backend_mut());
        let _ = self.terminal.show_cursor();
    }
}

pub async fn run(runtime: &Runtime) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let listener = runtime.voice_listener();
    let voice = listener.is_some();
    let mut agent = runtime
        .agent(runtime.speaker(), Some(event_tx))?
        .with_commands(command_rx);
    if let Some(listener) = listener {
        agent = agent.with_listener(listener);
    }

    let categories: HashMap<_, _> = agent
        .dispatcher()
        .registry()
        .definitions()
        .into_iter()
        .map(|def| (def.name, def.category))
        .collect();
    let (stats, sampler) = spawn_sampler();
    let mut app = App::new(runtime.config.name(), categories, voice, command_tx.clone(), event_rx)
        .with_stats(stats);

    let mut agent_task = tokio::spawn(agent.run());

    let result = {
        let mut session = TerminalSession::new()?;
        frame_loop(&mut session.terminal, &mut app).await
    };

    sampler.abort();
    let _ = command_tx.send(AgentCommand::Shutdown);
    if tokio::time::timeout(SHUTDOWN_GRACE, &mut agent_task).await.is_err() {
        tracing::warn!("Agent did not stop in time");
        agent_task.abort();
    }
    result
}

async fn frame_loop<B>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B: Backend,
    B::Error: Send + Sync + 'static,
{
    let mut input = InputPump::new();
    let mut frames = tokio::time::interval(FRAME_DURATION);
    frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result: Result<()> = loop {
        frames.tick().await;

        match handle_events(app, &mut input) {
            Ok(true) => break Ok(()),
            Ok(false) => {}
            Err(e) => break Err(e),
        }

        app.tick();

        if let Err(e) = terminal.draw(|frame| draw(frame, app)) {
            break Err(e.into());
        }
    };

    input.shutdown().await;
    result
}
