use ratatui::{
    layout::{Alignment, Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use splitwatch::{format::format_time, ranking::standings, ranking::RankLabel};

use crate::App;

const NAME_WIDTH: u16 = 24;

pub struct BoardRow {
    pub position: usize,
    pub name: String,
    pub rank: Option<usize>,
    pub laps: usize,
    pub last_lap: Option<u64>,
    pub finished: bool,
    /// final time once finished, the running clock otherwise
    pub time: u64,
}

pub fn board_rows(app: &App) -> Vec<BoardRow> {
    let table = standings(app.runners());
    let elapsed = app.session.elapsed();
    app.runners()
        .runners()
        .iter()
        .enumerate()
        .map(|(idx, runner)| BoardRow {
            position: idx + 1,
            name: runner.name.clone(),
            rank: table
                .iter()
                .find(|s| s.runner_id == runner.id)
                .map(|s| s.rank),
            laps: runner.splits().len(),
            last_lap: runner.splits().last().map(|s| s.lap),
            finished: runner.is_finished(),
            time: runner.final_time().unwrap_or(elapsed),
        })
        .collect()
}

/// Cuts `text` to at most `max` display columns, marking the cut with `…`.
pub fn fit_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

fn rank_style(rank: usize) -> Style {
    match rank {
        1 => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        2 => Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
        3 => Style::default()
            .fg(Color::Rgb(205, 127, 50))
            .add_modifier(Modifier::BOLD),
        _ => Style::default(),
    }
}

/// Pure presenter for a single board row
pub fn present_row(row: &BoardRow) -> Row<'static> {
    let rank_cell = match row.rank {
        Some(rank) => Cell::from(RankLabel(rank).to_string()).style(rank_style(rank)),
        None => Cell::from("-").style(Style::default().add_modifier(Modifier::DIM)),
    };
    let (status, status_style) = if row.finished {
        ("Finished", Style::default().fg(Color::Green))
    } else {
        ("Running", Style::default().fg(Color::Blue))
    };
    let time_style = if row.finished {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };

    Row::new(vec![
        Cell::from(row.position.to_string()),
        Cell::from(fit_width(&row.name, NAME_WIDTH as usize)),
        rank_cell,
        Cell::from(row.laps.to_string()),
        Cell::from(row.last_lap.map_or_else(|| "-".to_string(), format_time)),
        Cell::from(status).style(status_style),
        Cell::from(format_time(row.time)).style(time_style),
    ])
}

pub fn render_board(app: &App, f: &mut Frame, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Runners");

    if app.runners().is_empty() {
        let empty = Paragraph::new("No runners. Press a to add one or i to import a list.")
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec!["#", "Runner", "Rank", "Laps", "Last Lap", "Status", "Time"])
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    let rows: Vec<Row> = board_rows(app).iter().map(present_row).collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Length(NAME_WIDTH),
            Constraint::Length(10),
            Constraint::Length(5),
            Constraint::Length(11),
            Constraint::Length(9),
            Constraint::Min(11),
        ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(Style::default().bg(Color::DarkGray))
    .highlight_symbol("> ");

    let mut state = TableState::default().with_selected(Some(app.selected));
    f.render_stateful_widget(table, area, &mut state);
}
