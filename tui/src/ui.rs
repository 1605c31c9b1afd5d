//! Dashboard rendering.

use std::iter;

use chrono::{DateTime, Local};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Padding, Paragraph, Wrap},
};

use crate::app::App;
use crate::stats::{Card, battery_card, cpu_card, date_card, ram_card, time_card};
use crate::theme::{battery_color, colors, state_color, styles};

const SIDEBAR_WIDTH: u16 = 28;
const CARD_HEIGHT: u16 = 4;

/// Draw the dashboard for the current wall-clock time.
pub fn draw(frame: &mut Frame, app: &mut App) {
    draw_at(frame, app, Local::now());
}

pub fn draw_at(frame: &mut Frame, app: &mut App, now: DateTime<Local>) {
    let bg = Block::default().style(Style::default().bg(colors::BG_DARK));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Sidebar + log
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(chunks[1]);
    draw_sidebar(frame, app, body[0], now);
    draw_log(frame, app, body[1]);

    draw_input(frame, app, chunks[2]);
    draw_status_bar(frame, app, chunks[3]);
}

fn panel() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(styles::border())
        .style(Style::default().bg(colors::BG_PANEL))
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let title = Line::from(Span::styled(
        format!(" {} ", app.name().to_uppercase()),
        Style::default()
            .fg(colors::PRIMARY)
            .add_modifier(Modifier::BOLD),
    ));
    let badge = Line::from(vec![
        Span::styled(format!(" {} TOOLS ", app.tool_count()), styles::badge()),
        Span::raw(" "),
    ])
    .alignment(Alignment::Right);

    let header = Paragraph::new(vec![badge]).block(panel().title_top(title));
    frame.render_widget(header, area);
}

fn card_lines(card: &Card, value_style: Style) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(card.value.clone(), value_style))];
    if let Some(detail) = &card.detail {
        lines.push(Line::from(Span::styled(detail.clone(), styles::muted())));
    }
    lines
}

fn draw_sidebar(frame: &mut Frame, app: &App, area: Rect, now: DateTime<Local>) {
    let stats = app.stats();
    let value = Style::default()
        .fg(colors::TEXT_PRIMARY)
        .add_modifier(Modifier::BOLD);
    let battery_style = stats
        .battery
        .map_or(styles::muted(), |b| value.fg(battery_color(b.percent)));

    let cards = [
        (time_card(now), value),
        (date_card(now), value.fg(colors::TEXT_SECONDARY)),
        (battery_card(stats.battery), battery_style),
        (cpu_card(stats.system), value.fg(colors::CYAN)),
        (ram_card(stats.system), value.fg(colors::CYAN)),
    ];

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            cards
                .iter()
                .map(|_| Constraint::Length(CARD_HEIGHT))
                .chain(iter::once(Constraint::Min(0))),
        )
        .split(area);

    for ((card, style), rect) in cards.iter().zip(rows.iter()) {
        let block = panel()
            .title_top(Line::from(Span::styled(format!(" {} ", card.title), styles::title())))
            .padding(Padding::horizontal(1));
        frame.render_widget(Paragraph::new(card_lines(card, *style)).block(block), *rect);
    }
}

/// Rows `text` takes when wrapped at `width` columns.
fn wrapped_rows(text: &str, width: usize) -> usize {
    if width == 0 {
        return 1;
    }
    text.chars().count().div_ceil(width).max(1)
}

fn draw_log(frame: &mut Frame, app: &mut App, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();
    for entry in app.log().iter() {
        let mut text_lines = entry.text.lines();
        let first = text_lines.next().unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled(format!("[{}] ", entry.time.format("%H:%M:%S")), styles::muted()),
            Span::styled(
                format!("{}: ", entry.sender),
                Style::default()
                    .fg(entry.tag.color())
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(first.to_string(), styles::text()),
        ]));
        for rest in text_lines {
            lines.push(Line::from(Span::styled(format!("  {rest}"), styles::text())));
        }
    }

    let inner_width = usize::from(area.width.saturating_sub(4));
    let inner_height = usize::from(area.height.saturating_sub(2));
    let total: usize = lines
        .iter()
        .map(|line| wrapped_rows(&line.to_string(), inner_width))
        .sum();
    let max_scroll = total.saturating_sub(inner_height);
    app.clamp_scroll(max_scroll);
    let offset = max_scroll - app.scroll();

    let mut block = panel()
        .title_top(Line::from(Span::styled(" ACTIVITY LOG ", styles::title())))
        .padding(Padding::horizontal(1));
    if app.scroll() > 0 {
        block = block.title_bottom(
            Line::from(Span::styled(format!(" +{} ", app.scroll()), styles::muted()))
                .alignment(Alignment::Right),
        );
    }

    let log = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((u16::try_from(offset).unwrap_or(u16::MAX), 0));
    frame.render_widget(log, area);
}

fn draw_input(frame: &mut Frame, app: &App, area: Rect) {
    let prompt = "> ";
    let inner_width = usize::from(area.width.saturating_sub(4 + 2));
    let chars: Vec<char> = app.input().chars().collect();
    let visible: String = chars[chars.len().saturating_sub(inner_width)..].iter().collect();

    let hints = Line::from(Span::styled(" Enter send ", styles::key_hint())).alignment(Alignment::Right);
    let input = Paragraph::new(Line::from(vec![
        Span::styled(prompt, Style::default().fg(colors::CYAN)),
        Span::styled(visible.clone(), styles::text()),
    ]))
    .block(
        panel()
            .title_top(Line::from(Span::styled(" COMMAND ", styles::title())))
            .title_top(hints)
            .padding(Padding::horizontal(1)),
    );
    frame.render_widget(input, area);

    let width = u16::try_from(visible.chars().count() + prompt.len()).unwrap_or(u16::MAX);
    frame.set_cursor_position((area.x.saturating_add(2).saturating_add(width), area.y + 1));
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (online, online_color) = if app.is_online() {
        ("ONLINE", colors::GREEN)
    } else {
        ("OFFLINE", colors::RED)
    };
    let mic = match (app.has_voice(), app.is_listening()) {
        (false, _) => "MIC: N/A",
        (true, true) => "MIC: ON",
        (true, false) => "MIC: MUTED",
    };

    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled("STATUS: ", styles::muted()),
        Span::styled(online, Style::default().fg(online_color).add_modifier(Modifier::BOLD)),
        Span::styled(" │ ", styles::muted()),
        Span::styled(app.state().label(), Style::default().fg(state_color(app.state()))),
        Span::styled(" │ ", styles::muted()),
        Span::styled(mic, styles::muted()),
        Span::styled(" │ ", styles::muted()),
        Span::styled(
            "F2 mic  Ctrl+L clear  Ctrl+R forget  PgUp/PgDn scroll  Esc quit",
            styles::key_hint(),
        ),
    ]));
    frame.render_widget(status, area);
}
