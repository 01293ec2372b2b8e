use ratatui::{prelude::*, widgets::Paragraph};

use offload_base::state::{GenerationPhase, SessionState};

use super::helpers::{spinner, truncate_string};
use super::theme;
use crate::app::AppState;

pub fn render_status_bar(frame: &mut Frame, state: &AppState, area: Rect) {
    let controller = &state.controller;
    let base_style = Style::default().bg(theme::BG_BASE).fg(theme::TEXT_MUTED);
    let spin = spinner(state.spinner_frame);
    let badge = |bg: Color| Style::default().fg(theme::BG_BASE).bg(bg).bold();

    let mut spans = vec![Span::styled(" ", base_style)];

    let (label, style) = match (controller.state, controller.phase) {
        (SessionState::Checking, _) => (format!(" {} CHECKING ", spin), badge(theme::TEXT_MUTED)),
        (SessionState::Loading, _) => (format!(" {} LOADING ", spin), badge(theme::WARNING)),
        (SessionState::Ready, GenerationPhase::Thinking) => (format!(" {} THINKING ", spin), badge(theme::ACCENT)),
        (SessionState::Ready, GenerationPhase::Streaming) => (format!(" {} STREAMING ", spin), badge(theme::SUCCESS)),
        (SessionState::Ready, GenerationPhase::Idle) => (" READY ".to_string(), badge(theme::SUCCESS)),
        (SessionState::Error, _) => (" ERROR ".to_string(), badge(theme::ERROR)),
        (SessionState::Uninitialized, _) => (" IDLE ".to_string(), badge(theme::TEXT_MUTED)),
    };
    spans.push(Span::styled(label, style));
    spans.push(Span::styled(" ", base_style));

    spans.push(Span::styled(
        format!(" {} ", state.engine_name),
        Style::default().fg(theme::BG_BASE).bg(theme::ACCENT_DIM).bold(),
    ));
    spans.push(Span::styled(" ", base_style));

    if controller.acceleration == Some(false) {
        spans.push(Span::styled(" NO ACCEL ", badge(theme::ERROR)));
        spans.push(Span::styled(" ", base_style));
    }

    if controller.tokens_so_far > 0 {
        let rate = controller.tokens_per_second.map(|r| format!(" @ {:.1} tok/s", r)).unwrap_or_default();
        spans.push(Span::styled(
            format!(" {} tokens{} ", controller.tokens_so_far, rate),
            Style::default().fg(theme::TEXT).bg(theme::BG_ELEVATED),
        ));
        spans.push(Span::styled(" ", base_style));
    }

    if !controller.is_generating()
        && let Some(reason) = controller.last_stop_reason
    {
        spans.push(Span::styled(
            format!(" {} ", reason.label()),
            Style::default().fg(theme::TEXT).bg(theme::BG_ELEVATED),
        ));
        spans.push(Span::styled(" ", base_style));
    }

    if controller.is_draining() {
        spans.push(Span::styled(format!(" {} STOPPING ", spin), badge(theme::TEXT_MUTED)));
        spans.push(Span::styled(" ", base_style));
    }

    if controller.has_deferred() {
        spans.push(Span::styled(" /send PENDING ", badge(theme::WARNING)));
        spans.push(Span::styled(" ", base_style));
    }

    // Status text takes whatever is left
    let used: usize = spans.iter().map(|s| s.width()).sum();
    let remaining = (area.width as usize).saturating_sub(used + 1);
    let message = match &controller.last_error {
        Some(err) if controller.state == SessionState::Error => Some(format!("{}: {}", err.kind.label(), err.message)),
        _ => controller.status_message.clone(),
    };
    if let Some(message) = message
        && remaining > 3
    {
        spans.push(Span::styled(truncate_string(&message, remaining), base_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).style(base_style), area);
}
