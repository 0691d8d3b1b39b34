use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{App, PendingConfirm, TextInput, Toast, ToastKind};

/// A `width` x `height` rectangle centred in `area`, clipped to fit.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

pub fn render_overlays(app: &App, f: &mut Frame) {
    render_toasts(&app.toasts, f);
    if let Some(input) = &app.input {
        render_input(input, f);
    }
    if let Some(pending) = &app.confirm {
        render_confirm(pending, f);
    }
}

fn render_confirm(pending: &PendingConfirm, f: &mut Frame) {
    let area = centered_rect(56, 7, f.area());
    let text = vec![
        Line::from(pending.prompt.message.clone()),
        Line::from(""),
        Line::from(vec![
            Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" confirm   "),
            Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ]),
    ];
    let modal = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(pending.prompt.title.clone()),
        );
    f.render_widget(Clear, area);
    f.render_widget(modal, area);
}

fn render_input(input: &TextInput, f: &mut Frame) {
    let area = centered_rect(60, 3, f.area());
    let inner_width = area.width.saturating_sub(2) as usize;
    // keep the cursor end visible for long paths
    let mut shown = input.buffer.as_str();
    while shown.width() + 1 > inner_width && !shown.is_empty() {
        let mut chars = shown.chars();
        chars.next();
        shown = chars.as_str();
    }
    let field = Paragraph::new(Line::from(vec![
        Span::raw(shown.to_string()),
        Span::styled("▏", Style::default().add_modifier(Modifier::SLOW_BLINK)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(input.title())
            .title_bottom("enter ok · esc cancel"),
    );
    f.render_widget(Clear, area);
    f.render_widget(field, area);
}

fn toast_style(kind: ToastKind) -> Style {
    match kind {
        ToastKind::Success => Style::default().fg(Color::Green),
        ToastKind::Error => Style::default().fg(Color::Red),
        ToastKind::Info => Style::default().fg(Color::Blue),
    }
}

/// Newest toast at the bottom, stacked in the lower right corner.
fn render_toasts(toasts: &[Toast], f: &mut Frame) {
    if toasts.is_empty() {
        return;
    }
    let screen = f.area();
    let width = toasts
        .iter()
        .map(|t| t.message.width() as u16 + 4)
        .max()
        .unwrap_or(0)
        .min(screen.width);
    let height = (toasts.len() as u16 + 2).min(screen.height);
    let area = Rect {
        x: screen.x + screen.width - width,
        y: screen.y + screen.height.saturating_sub(height + 1),
        width,
        height,
    };

    let lines: Vec<Line> = toasts
        .iter()
        .map(|t| Line::styled(t.message.clone(), toast_style(t.kind)))
        .collect();
    let stack = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    f.render_widget(Clear, area);
    f.render_widget(stack, area);
}
