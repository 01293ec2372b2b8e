use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Paragraph},
};
use unicode_width::UnicodeWidthStr;

use super::theme;
use crate::app::AppState;

/// Rows for the input box, growing with its content
pub fn input_height(state: &AppState) -> u16 {
    let lines = state.input.split('\n').count().max(1) as u16;
    (lines + 2).clamp(3, 10)
}

pub fn render_input(frame: &mut Frame, state: &AppState, area: Rect) {
    let generating = state.controller.is_generating();
    let title = if generating { " Esc to stop " } else { " Message " };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if generating { theme::BORDER } else { theme::BORDER_FOCUS }))
        .style(Style::default().bg(theme::BG_INPUT))
        .title(Span::styled(title, Style::default().fg(theme::TEXT_MUTED)));
    let content_area = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = state
        .input
        .split('\n')
        .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(theme::TEXT))))
        .collect();

    // Keep the cursor line visible
    let before_cursor = &state.input[..state.input_cursor];
    let line_num = before_cursor.matches('\n').count() as u16;
    let top = line_num.saturating_sub(content_area.height.saturating_sub(1));
    frame.render_widget(Paragraph::new(lines).scroll((top, 0)), content_area.inner(Margin::new(1, 0)));

    let line_start = before_cursor.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let col = before_cursor[line_start..].width() as u16;
    frame.set_cursor_position(Position::new(
        content_area.x + 1 + col.min(content_area.width.saturating_sub(2)),
        content_area.y + line_num - top,
    ));
}

pub fn render_notice(frame: &mut Frame, state: &AppState, area: Rect) {
    let Some(notice) = &state.notice else {
        return;
    };
    frame.render_widget(
        Paragraph::new(format!(" {}", notice)).style(Style::default().fg(theme::WARNING).bg(theme::BG_BASE)),
        area,
    );
}
