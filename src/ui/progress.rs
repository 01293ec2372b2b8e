use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, LineGauge, Paragraph},
};

use offload_base::format::format_bytes;
use offload_base::progress::ProgressTask;

use super::helpers::{spinner, truncate_string};
use super::theme;
use crate::app::AppState;

const NAME_WIDTH: u16 = 28;
const SIZE_WIDTH: u16 = 22;

/// Rows needed for the progress panel, 0 when nothing is loading
pub fn progress_height(state: &AppState) -> u16 {
    let tasks = state.controller.progress.tasks().len();
    if tasks == 0 { 0 } else { tasks.min(6) as u16 + 2 }
}

pub fn render_progress(frame: &mut Frame, state: &AppState, area: Rect) {
    let progress = &state.controller.progress;
    let title = match progress.overall_fraction() {
        Some(f) => format!(" Loading weights {:.0}% ", f * 100.0),
        None => " Loading weights ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme::BORDER))
        .style(Style::default().bg(theme::BG_SURFACE))
        .title(Span::styled(title, Style::default().fg(theme::WARNING).bold()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    for (row, task) in progress.tasks().iter().take(inner.height as usize).enumerate() {
        let row_area = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
        render_task(frame, task, state.spinner_frame, row_area);
    }
}

fn render_task(frame: &mut Frame, task: &ProgressTask, spinner_frame: usize, area: Rect) {
    let [name_area, bar_area, size_area] = Layout::horizontal([
        Constraint::Length(NAME_WIDTH),
        Constraint::Min(4),
        Constraint::Length(SIZE_WIDTH),
    ])
    .areas(area);

    frame.render_widget(
        Paragraph::new(format!(" {}", truncate_string(&task.id, NAME_WIDTH as usize - 2)))
            .style(Style::default().fg(theme::TEXT)),
        name_area,
    );

    let size = match task.total_bytes {
        Some(total) => format!("{} / {}", format_bytes(task.loaded_bytes), format_bytes(total)),
        None => format_bytes(task.loaded_bytes),
    };
    frame.render_widget(
        Paragraph::new(size).alignment(Alignment::Right).style(Style::default().fg(theme::TEXT_MUTED)),
        size_area,
    );

    match task.fraction() {
        Some(ratio) => frame.render_widget(
            LineGauge::default()
                .ratio(ratio)
                .filled_style(Style::default().fg(theme::ACCENT))
                .unfilled_style(Style::default().fg(theme::BG_ELEVATED)),
            bar_area,
        ),
        // Unknown size: animate instead of guessing a ratio
        None => frame.render_widget(
            Paragraph::new(format!(" {} downloading", spinner(spinner_frame)))
                .style(Style::default().fg(theme::TEXT_MUTED)),
            bar_area,
        ),
    }
}
