mod conversation;
mod helpers;
mod input;
mod progress;
mod status;
mod theme;

use ratatui::{prelude::*, widgets::Block};

use crate::app::AppState;

pub fn render(frame: &mut Frame, state: &AppState) {
    let area = frame.area();

    frame.render_widget(Block::default().style(Style::default().bg(theme::BG_BASE)), area);

    let notice_height = u16::from(state.notice.is_some());
    let [conversation_area, progress_area, notice_area, input_area, status_area] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(progress::progress_height(state)),
        Constraint::Length(notice_height),
        Constraint::Length(input::input_height(state)),
        Constraint::Length(1),
    ])
    .areas(area);

    conversation::render_conversation(frame, state, conversation_area);
    if progress_area.height > 0 {
        progress::render_progress(frame, state, progress_area);
    }
    input::render_notice(frame, state, notice_area);
    input::render_input(frame, state, input_area);
    status::render_status_bar(frame, state, status_area);
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use offload_base::conversation::ContentPart;
    use offload_base::protocol::{Event, StopReason};
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;
    use crate::controller::Controller;

    fn screen(state: &AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render(frame, state)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn renders_streamed_reply_and_status() {
        let (tx, _rx) = mpsc::channel();
        let mut state = AppState::new(Controller::new(tx, None), "phrasebook");
        let c = &mut state.controller;
        c.handle_event(Event::Checked { acceleration_available: true });
        c.load().unwrap();
        c.handle_event(Event::Ready);
        c.submit(vec![ContentPart::Text("Translate: hello world".into())]).unwrap();
        c.handle_event(Event::GenerationStarted);
        c.handle_event(Event::TokenProduced { text: "Hola ".into(), tokens_so_far: 1, tokens_per_second: None });
        c.handle_event(Event::TokenProduced { text: "mundo".into(), tokens_so_far: 2, tokens_per_second: Some(4.0) });

        let streaming = screen(&state);
        assert!(streaming.contains("Hola mundo"));
        assert!(streaming.contains("STREAMING"));
        assert!(streaming.contains("phrasebook"));

        state.controller.handle_event(Event::GenerationComplete {
            final_text: Some("Hola mundo".into()),
            stop_reason: StopReason::Finished,
        });
        let done = screen(&state);
        assert!(done.contains("READY"));
        assert!(done.contains("FINISHED"));
    }

    #[test]
    fn renders_load_progress() {
        let (tx, _rx) = mpsc::channel();
        let mut state = AppState::new(Controller::new(tx, None), "caption");
        let c = &mut state.controller;
        c.handle_event(Event::Checked { acceleration_available: true });
        c.load().unwrap();
        c.handle_event(Event::ProgressInit { task_id: "vision.bin".into(), total_bytes: Some(2048) });
        c.handle_event(Event::ProgressUpdate { task_id: "vision.bin".into(), loaded_bytes: 1024, total_bytes: Some(2048) });

        let text = screen(&state);
        assert!(text.contains("vision.bin"));
        assert!(text.contains("1.0 KB / 2.0 KB"));
        assert!(text.contains("LOADING"));
    }

    #[test]
    fn deferred_turn_renders_below_the_open_reply() {
        let (tx, _rx) = mpsc::channel();
        let mut state = AppState::new(Controller::new(tx, None), "phrasebook");
        let c = &mut state.controller;
        c.handle_event(Event::Checked { acceleration_available: true });
        c.load().unwrap();
        c.handle_event(Event::Ready);
        c.submit(vec![ContentPart::Text("first".into())]).unwrap();
        c.submit(vec![ContentPart::Text("second".into())]).unwrap();

        let text = screen(&state);
        let thinking = text.find("thinking").unwrap();
        let deferred = text.find("second").unwrap();
        assert!(thinking < deferred);
    }

    #[test]
    fn renders_empty_session() {
        let (tx, _rx) = mpsc::channel();
        let state = AppState::new(Controller::new(tx, None), "phrasebook");
        assert!(screen(&state).contains("IDLE"));
    }
}
