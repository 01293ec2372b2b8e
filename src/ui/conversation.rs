use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Paragraph},
};

use offload_base::config::DEFAULTS;
use offload_base::conversation::{ContentPart, ConversationTurn, Role};
use offload_base::format::format_bytes;

use super::helpers::{spinner, wrap_text};
use super::theme;
use crate::app::AppState;

pub fn render_conversation(frame: &mut Frame, state: &AppState, area: Rect) {
    let controller = &state.controller;
    let generating = controller.is_generating();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme::BORDER))
        .style(Style::default().bg(theme::BG_SURFACE))
        .title(Span::styled(
            if generating { " Conversation ● " } else { " Conversation " },
            Style::default().fg(theme::ACCENT).bold(),
        ));
    let content_area = block.inner(area);
    frame.render_widget(block, area);

    let lines = conversation_lines(state, content_area.width.saturating_sub(2) as usize);

    // scroll_offset counts lines up from the bottom
    let visible = content_area.height as usize;
    let max_top = lines.len().saturating_sub(visible);
    let top = max_top.saturating_sub(state.scroll_offset as usize);

    let paragraph = Paragraph::new(lines).scroll((top.min(u16::MAX as usize) as u16, 0));
    frame.render_widget(paragraph, content_area.inner(Margin::new(1, 0)));
}

fn conversation_lines(state: &AppState, width: usize) -> Vec<Line<'static>> {
    let controller = &state.controller;
    let mut lines = Vec::new();

    if controller.conversation.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Type a message below. /image <path> attaches a picture.",
            Style::default().fg(theme::TEXT_MUTED).italic(),
        )));
        return lines;
    }

    let streaming = controller.streaming_turn().filter(|_| controller.is_generating());
    for (i, turn) in controller.conversation.iter().enumerate() {
        let (label, color) = match turn.role {
            Role::User => ("You", theme::USER),
            Role::Assistant => ("Model", theme::ASSISTANT),
        };
        lines.push(Line::from(Span::styled(label, Style::default().fg(color).bold())));

        let streaming_here = streaming == Some(i);
        if streaming_here && !turn.has_text() {
            lines.push(Line::from(Span::styled(
                format!("{} thinking", spinner(state.spinner_frame)),
                Style::default().fg(theme::TEXT_MUTED).italic(),
            )));
        } else {
            push_turn_body(&mut lines, turn, width);
            if streaming_here {
                lines.push(Line::from(Span::styled(spinner(state.spinner_frame), Style::default().fg(theme::ACCENT))));
            }
        }
        lines.push(Line::from(""));
    }
    lines
}

fn push_turn_body(lines: &mut Vec<Line<'static>>, turn: &ConversationTurn, width: usize) {
    for part in &turn.content {
        match part {
            ContentPart::Image(bytes) => lines.push(Line::from(Span::styled(
                format!("[image, {}]", format_bytes(bytes.len() as u64)),
                Style::default().fg(theme::WARNING),
            ))),
            ContentPart::Text(text) => {
                let style = if is_error_marker(text) {
                    Style::default().fg(theme::ERROR)
                } else {
                    Style::default().fg(theme::TEXT)
                };
                for paragraph in text.split('\n') {
                    for line in wrap_text(paragraph, width) {
                        lines.push(Line::from(Span::styled(line, style)));
                    }
                }
            }
        }
    }
}

/// Replies replaced by the failure marker render in the error color
fn is_error_marker(text: &str) -> bool {
    let template = &DEFAULTS.messages.error_marker;
    match template.split_once("{message}") {
        Some((prefix, suffix)) => text.starts_with(prefix) && text.ends_with(suffix),
        None => text == template,
    }
}
