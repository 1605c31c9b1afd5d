//! Colors for the dashboard.
//!
//! Kanagawa Wave palette, with the log tags and state indicators mapped onto
//! its accents.

use ratatui::style::{Color, Modifier, Style};

use nexus_engine::AgentState;

pub mod colors {
    use super::Color;

    pub const BG_DARK: Color = Color::Rgb(22, 22, 29); // sumiInk0
    pub const BG_PANEL: Color = Color::Rgb(31, 31, 40); // sumiInk3
    pub const BG_BORDER: Color = Color::Rgb(84, 84, 109); // sumiInk6

    pub const TEXT_PRIMARY: Color = Color::Rgb(220, 215, 186); // fujiWhite
    pub const TEXT_SECONDARY: Color = Color::Rgb(200, 192, 147); // oldWhite
    pub const TEXT_MUTED: Color = Color::Rgb(114, 113, 105); // fujiGray

    pub const PRIMARY: Color = Color::Rgb(149, 127, 184); // oniViolet
    pub const CYAN: Color = Color::Rgb(127, 180, 202); // springBlue
    pub const GREEN: Color = Color::Rgb(152, 187, 108); // springGreen
    pub const YELLOW: Color = Color::Rgb(230, 195, 132); // carpYellow
    pub const ORANGE: Color = Color::Rgb(255, 160, 102); // surimiOrange
    pub const RED: Color = Color::Rgb(255, 93, 98); // peachRed
}

/// Category of an activity log line; decides the sender color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTag {
    User,
    Assistant,
    System,
    Action,
    Error,
    Status,
}

impl LogTag {
    #[must_use]
    pub const fn color(self) -> Color {
        match self {
            LogTag::User => colors::CYAN,
            LogTag::Assistant => colors::GREEN,
            LogTag::System => colors::YELLOW,
            LogTag::Action => colors::ORANGE,
            LogTag::Error => colors::RED,
            LogTag::Status => colors::TEXT_MUTED,
        }
    }
}

#[must_use]
pub const fn state_color(state: AgentState) -> Color {
    match state {
        AgentState::Idle => colors::TEXT_MUTED,
        AgentState::Listening => colors::GREEN,
        AgentState::Thinking => colors::YELLOW,
        AgentState::Executing => colors::ORANGE,
    }
}

/// Green above 60 %, yellow above 20 %, red below.
#[must_use]
pub const fn battery_color(percent: u8) -> Color {
    if percent > 60 {
        colors::GREEN
    } else if percent > 20 {
        colors::YELLOW
    } else {
        colors::RED
    }
}

pub mod styles {
    use super::{Modifier, Style, colors};

    #[must_use]
    pub fn border() -> Style {
        Style::default().fg(colors::BG_BORDER)
    }

    #[must_use]
    pub fn title() -> Style {
        Style::default()
            .fg(colors::YELLOW)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn muted() -> Style {
        Style::default().fg(colors::TEXT_MUTED)
    }

    #[must_use]
    pub fn text() -> Style {
        Style::default().fg(colors::TEXT_PRIMARY)
    }

    #[must_use]
    pub fn badge() -> Style {
        Style::default()
            .fg(colors::BG_DARK)
            .bg(colors::YELLOW)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn key_hint() -> Style {
        Style::default().fg(colors::PRIMARY)
    }
}
