use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use splitwatch::{
    format::format_time,
    ranking::RankLabel,
    stats::{runner_stats, LogEntry, Pace},
};

use crate::{ui::board::fit_width, ui::filter_label, App};

fn lap_style(entry: &LogEntry) -> Style {
    if entry.best_lap {
        return Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD);
    }
    match entry.pace {
        Some(Pace::OnPace) => Style::default().fg(Color::Green),
        Some(Pace::OffPace) => Style::default().fg(Color::Red),
        None => Style::default(),
    }
}

fn note(entry: &LogEntry) -> String {
    let mut parts = Vec::new();
    if entry.split.is_finish {
        parts.push("FINISH".to_string());
    }
    if entry.best_lap {
        parts.push("best".to_string());
    }
    if let Some(pace) = entry.pace {
        parts.push(pace.to_string());
    }
    parts.join(", ")
}

/// Pure presenter for a single lap log row
pub fn present_entry(entry: &LogEntry) -> Row<'static> {
    let rank = entry
        .rank
        .map_or_else(|| "-".to_string(), |r| RankLabel(r).to_string());
    let total_style = if entry.split.is_finish {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    Row::new(vec![
        Cell::from(rank),
        Cell::from(fit_width(&entry.runner_name, 20)),
        Cell::from(entry.split.index.to_string()),
        Cell::from(format_time(entry.split.lap)).style(lap_style(entry)),
        Cell::from(format_time(entry.split.total)).style(total_style),
        Cell::from(note(entry)),
    ])
}

/// One line per shown runner with laps: best, average, spread and count.
pub fn stats_lines(app: &App) -> Vec<Line<'static>> {
    app.runners()
        .runners()
        .iter()
        .filter(|r| app.filter.admits(r.id))
        .filter_map(|r| runner_stats(r).map(|s| (r, s)))
        .map(|(runner, stats)| {
            Line::from(vec![
                Span::styled(
                    fit_width(&runner.name, 20),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(
                    "  best {}  avg {}  σ {}  laps {}",
                    format_time(stats.min_lap),
                    format_time(stats.avg_lap.round() as u64),
                    format_time(stats.std_dev.round() as u64),
                    stats.lap_count
                )),
            ])
        })
        .collect()
}

pub fn render_lap_log(app: &App, f: &mut Frame, area: Rect) {
    let entries = app.log_entries();
    let summary = stats_lines(app);
    let summary_height = (summary.len() as u16 + 2).min(area.height / 3).max(3);

    let [table_area, summary_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(summary_height)]).areas(area);

    let title = format!("Lap Log · {} · {}", filter_label(app), app.sort);
    let block = Block::default().borders(Borders::ALL).title(title);

    if entries.is_empty() {
        let empty = Paragraph::new("No laps recorded yet.")
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, table_area);
    } else {
        let header = Row::new(vec!["Rank", "Runner", "Lap", "Lap Time", "Total", "Note"]).style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
        let rows: Vec<Row> = entries.iter().map(present_entry).collect();
        let table = Table::new(
            rows,
            [
                Constraint::Length(10),
                Constraint::Length(20),
                Constraint::Length(4),
                Constraint::Length(11),
                Constraint::Length(11),
                Constraint::Min(10),
            ],
        )
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");

        let mut state = TableState::default().with_selected(Some(app.log_selected));
        f.render_stateful_widget(table, table_area, &mut state);
    }

    let stats = Paragraph::new(summary).block(Block::default().borders(Borders::ALL).title("Stats"));
    f.render_widget(stats, summary_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ui::tests::rendered, View};
    use splitwatch::session::RaceSession;
    use splitwatch::stats::SortMode;
    use std::time::{Duration, Instant};

    fn raced_app() -> App {
        let t0 = Instant::now();
        let at = |ms| t0 + Duration::from_millis(ms);
        let mut session = RaceSession::new();
        session.rename_runner(1, "Budi").unwrap();
        session.set_target_pace("00:05");
        session.start_clock(t0);
        session.record_split(1, at(4_000)).unwrap();
        session.record_split(1, at(10_000)).unwrap();
        session.finish_runner(1, at(17_000)).unwrap();
        let mut app = App::for_tests(session);
        app.view = View::LapLog;
        app
    }

    #[test]
    fn test_note_flags() {
        let app = raced_app();
        let notes: Vec<String> = app.log_entries().iter().map(note).collect();
        assert_eq!(notes, vec!["best, on pace", "off pace", "FINISH"]);
    }

    #[test]
    fn test_stats_line() {
        let app = raced_app();
        let lines = stats_lines(&app);
        assert_eq!(lines.len(), 1);
        let text: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(
            text,
            "Budi  best 00:04.00  avg 00:05.66  σ 00:01.24  laps 3"
        );
    }

    #[test]
    fn test_lap_log_renders_rows_and_title() {
        let mut app = raced_app();
        app.sort = SortMode::Chronological;
        let content = rendered(&app, 120, 30);
        assert!(content.contains("Lap Log · all runners · Chronological"));
        assert!(content.contains("1st Place"));
        assert!(content.contains("00:17.00"));
        assert!(content.contains("FINISH"));
    }

    #[test]
    fn test_empty_log() {
        let mut app = App::for_tests(RaceSession::new());
        app.view = View::LapLog;
        assert!(rendered(&app, 100, 20).contains("No laps recorded yet."));
    }
}
