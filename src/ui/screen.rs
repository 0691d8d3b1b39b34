use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::{
    ui::{board::render_board, charting::render_chart, lap_log::render_lap_log},
    AnalysisState, App, View,
};

/// A UI Screen boundary: renders one view into the body area
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect);
}

pub struct BoardScreen;

impl Screen for BoardScreen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        render_board(app, f, area);
    }
}

pub struct LapLogScreen;

impl Screen for LapLogScreen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        render_lap_log(app, f, area);
    }
}

pub struct ChartScreen;

impl Screen for ChartScreen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        render_chart(app, f, area);
    }
}

/// Analysis screen - shows the analyst's text or where the request stands
pub struct AnalysisScreen;

impl Screen for AnalysisScreen {
    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        let dim = Style::default().add_modifier(Modifier::DIM);
        let lines: Vec<Line> = match &app.analysis {
            AnalysisState::Idle if app.config.analysis_command.is_none() => vec![
                Line::from("No analysis command configured."),
                Line::styled(
                    "Start with --analysis-command <CMD>; the race summary is sent to it on stdin.",
                    dim,
                ),
            ],
            AnalysisState::Idle => vec![Line::from("Press g to analyse the race.")],
            AnalysisState::Pending(_) => vec![Line::from(Span::styled(
                "Analysing…",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ))],
            AnalysisState::Ready(text) => text.lines().map(|l| Line::from(l.to_string())).collect(),
            AnalysisState::Failed(message) => vec![
                Line::styled(message.clone(), Style::default().fg(Color::Red)),
                Line::styled("Press g to try again.", dim),
            ],
        };

        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Race Analysis"));
        f.render_widget(paragraph, area);
    }
}

/// Helper to construct the screen for the active view
pub fn current_screen(view: View) -> Box<dyn Screen> {
    match view {
        View::Board => Box::new(BoardScreen),
        View::LapLog => Box::new(LapLogScreen),
        View::Chart => Box::new(ChartScreen),
        View::Analysis => Box::new(AnalysisScreen),
    }
}
