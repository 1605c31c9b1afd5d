//! Terminal dashboard for Nexus using ratatui.
//!
//! The front end never blocks on the agent: agent events arrive on a channel
//! and are folded into [`App`] once per frame, typed commands go back as
//! [`AgentCommand`](nexus_engine::AgentCommand)s.

mod app;
mod input;
mod log;
mod stats;
mod theme;
mod ui;

pub use app::App;
pub use input::{InputPump, apply_event, handle_events};
pub use log::{ActivityLog, LogEntry, describe_event};
pub use stats::{Card, REFRESH_INTERVAL, Stats, spawn_sampler};
pub use theme::{LogTag, colors, styles};
pub use ui::{draw, draw_at};
