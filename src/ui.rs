pub mod board;
pub mod charting;
pub mod lap_log;
pub mod overlay;
pub mod screen;

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use splitwatch::{clock::ClockState, format::format_time, stats::RunnerFilter};

use crate::{ui::screen::current_screen, App, View};

/// Draws the whole frame: header, the active view, key hints, then overlays.
pub fn draw(app: &App, f: &mut Frame) {
    let [header, body, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(f.area());

    render_header(app, f, header);
    current_screen(app.view).render(app, f, body);
    render_footer(app, f, footer);
    overlay::render_overlays(app, f);
}

fn clock_status(state: ClockState) -> (&'static str, Color) {
    match state {
        ClockState::Stopped => ("READY", Color::DarkGray),
        ClockState::Running => ("RUNNING", Color::Green),
        ClockState::Paused => ("PAUSED", Color::Yellow),
    }
}

fn render_header(app: &App, f: &mut Frame, area: Rect) {
    let [clock_area, tabs_area] =
        Layout::horizontal([Constraint::Length(26), Constraint::Min(0)]).areas(area);

    let (status, color) = clock_status(app.session.clock().state());
    let clock = Paragraph::new(Line::from(vec![
        Span::styled(
            format_time(app.session.elapsed()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(status, Style::default().fg(color)),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Race Clock"));
    f.render_widget(clock, clock_area);

    let target = match app.session.target_pace().ms {
        0 => "no target pace".to_string(),
        ms => format!("target {}", format_time(ms)),
    };
    let selected = View::ALL.iter().position(|v| *v == app.view).unwrap_or(0);
    let tabs = Tabs::new(View::ALL.iter().map(|v| v.to_string()))
        .select(selected)
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} runners · {target}", app.runners().len())),
        );
    f.render_widget(tabs, tabs_area);
}

fn key_hints(view: View) -> &'static str {
    match view {
        View::Board => {
            "space start/pause · enter split · 1-9 split # · f finish · a add · n rename · x remove · t pace · i import · e export · tab views · q quit"
        }
        View::LapLog => {
            "↑/↓ select · x delete lap · o sort · ←/→ runner · space start/pause · tab views · q quit"
        }
        View::Chart => "←/→ runner · space start/pause · tab views · q quit",
        View::Analysis => "g analyse · space start/pause · tab views · q quit",
    }
}

fn render_footer(app: &App, f: &mut Frame, area: Rect) {
    let hints = Paragraph::new(key_hints(app.view))
        .style(Style::default().add_modifier(Modifier::DIM))
        .alignment(Alignment::Center);
    f.render_widget(hints, area);
}

/// Which runners the lap log and chart currently show.
pub fn filter_label(app: &App) -> String {
    match app.filter {
        RunnerFilter::All => "all runners".to_string(),
        RunnerFilter::Only(id) => app
            .runners()
            .get(id)
            .map(|r| r.name.clone())
            .unwrap_or_else(|_| "all runners".to_string()),
    }
}
