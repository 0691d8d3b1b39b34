use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Style},
    symbols::Marker,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use splitwatch::{
    format::format_axis,
    runner::RunnerId,
    stats::{lap_series, LapPoint},
};

use crate::{ui::filter_label, App};

const PALETTE: [Color; 6] = [
    Color::Cyan,
    Color::Magenta,
    Color::Yellow,
    Color::Green,
    Color::LightRed,
    Color::LightBlue,
];

/// X (lap number) and Y (lap duration in ms) upper bounds for the lap chart
pub fn chart_bounds(series: &[LapPoint]) -> (f64, f64) {
    let max_lap = series.last().map_or(1, |p| p.lap).max(2);
    let max_ms = series
        .iter()
        .flat_map(|p| p.values.iter().map(|&(_, v)| v))
        .max()
        .unwrap_or(0)
        .max(1_000);
    (max_lap as f64, max_ms as f64)
}

/// The points one runner contributes; laps it does not have are skipped.
pub fn runner_points(series: &[LapPoint], id: RunnerId) -> Vec<(f64, f64)> {
    series
        .iter()
        .filter_map(|p| p.value_for(id).map(|v| (p.lap as f64, v as f64)))
        .collect()
}

/// Three duration labels from zero to `max_ms`
pub fn y_labels(max_ms: f64) -> Vec<String> {
    let max = max_ms.max(0.0) as u64;
    vec![format_axis(0), format_axis(max / 2), format_axis(max)]
}

pub fn render_chart(app: &App, f: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Lap Times · {}", filter_label(app)));
    let series = lap_series(app.runners(), app.filter);

    if series.is_empty() {
        let empty = Paragraph::new("No laps recorded yet.")
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let lines: Vec<(String, Color, Vec<(f64, f64)>)> = app
        .runners()
        .runners()
        .iter()
        .enumerate()
        .filter(|(_, r)| app.filter.admits(r.id))
        .map(|(idx, r)| {
            (
                r.name.clone(),
                PALETTE[idx % PALETTE.len()],
                runner_points(&series, r.id),
            )
        })
        .filter(|(_, _, points)| !points.is_empty())
        .collect();

    let datasets: Vec<Dataset> = lines
        .iter()
        .map(|(name, color, points)| {
            Dataset::default()
                .name(name.clone())
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(*color))
                .data(points)
        })
        .collect();

    let (max_lap, max_ms) = chart_bounds(&series);
    let x_labels = vec![
        "1".to_string(),
        format!("{}", (max_lap as u32 + 1) / 2),
        format!("{}", max_lap as u32),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title("Lap")
                .bounds([1.0, max_lap])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title("Lap time")
                .bounds([0.0, max_ms])
                .labels(y_labels(max_ms)),
        );
    f.render_widget(chart, area);
}
