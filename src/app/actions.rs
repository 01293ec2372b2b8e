use tracing::warn;

use offload_base::config::DEFAULTS;

use super::input::{ParsedInput, parse_input};
use super::state::AppState;
use crate::controller::{ControllerError, Submission};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    InputChar(char),
    InputBackspace,
    CursorLeft,
    CursorRight,
    CursorHome,
    CursorEnd,
    PasteText(String),
    InputSubmit,
    Interrupt,
    Load,
    Reset,
    ClearConversation,
    ScrollUp(u16),
    ScrollDown(u16),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionResult {
    Nothing,
    /// State changed and needs a redraw
    Redraw,
}

pub fn apply_action(state: &mut AppState, action: Action) -> ActionResult {
    match action {
        Action::None => return ActionResult::Nothing,
        Action::InputChar(c) => {
            state.input.insert(state.input_cursor, c);
            state.input_cursor += c.len_utf8();
        }
        Action::InputBackspace => {
            if let Some(prev) = state.input[..state.input_cursor].chars().next_back() {
                state.input_cursor -= prev.len_utf8();
                state.input.remove(state.input_cursor);
            }
        }
        Action::CursorLeft => {
            if let Some(prev) = state.input[..state.input_cursor].chars().next_back() {
                state.input_cursor -= prev.len_utf8();
            }
        }
        Action::CursorRight => {
            if let Some(next) = state.input[state.input_cursor..].chars().next() {
                state.input_cursor += next.len_utf8();
            }
        }
        Action::CursorHome => state.input_cursor = 0,
        Action::CursorEnd => state.input_cursor = state.input.len(),
        Action::PasteText(text) => {
            state.input.insert_str(state.input_cursor, &text);
            state.input_cursor += text.len();
        }
        Action::InputSubmit => submit_input(state),
        Action::Interrupt => {
            let result = state.controller.interrupt();
            report(state, result);
        }
        Action::Load => {
            let result = state.controller.load();
            report(state, result);
        }
        Action::Reset => {
            let result = state.controller.reset();
            state.scroll_offset = 0;
            report(state, result);
        }
        Action::ClearConversation => {
            let result = state.controller.clear_conversation();
            state.scroll_offset = 0;
            report(state, result);
        }
        Action::ScrollUp(amount) => state.scroll_offset = state.scroll_offset.saturating_add(amount),
        Action::ScrollDown(amount) => state.scroll_offset = state.scroll_offset.saturating_sub(amount),
    }
    ActionResult::Redraw
}

fn submit_input(state: &mut AppState) {
    if state.input.trim().is_empty() {
        return;
    }
    let parsed = match parse_input(&state.input) {
        Ok(parsed) => parsed,
        Err(e) => {
            state.notice = Some(e.to_string());
            return;
        }
    };

    let result = match parsed {
        ParsedInput::Turn(parts) => state.controller.submit(parts).map(|submission| {
            if submission == Submission::Deferred {
                state.notice = Some(DEFAULTS.messages.deferred.clone());
            }
        }),
        ParsedInput::SendPending => state.controller.send_pending(),
        ParsedInput::Load => state.controller.load(),
        ParsedInput::Reset => state.controller.reset(),
        ParsedInput::Clear => state.controller.clear_conversation(),
    };

    // Keep the text when it was refused so the user can retry
    if result.is_ok() {
        state.input.clear();
        state.input_cursor = 0;
        state.scroll_offset = 0;
    }
    report(state, result);
}

fn report(state: &mut AppState, result: Result<(), ControllerError>) {
    match result {
        Ok(()) => {
            if !matches!(&state.notice, Some(n) if *n == DEFAULTS.messages.deferred) {
                state.notice = None;
            }
        }
        Err(e) => {
            warn!(error = %e, "action refused");
            state.notice = Some(e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{self, Receiver};

    use offload_base::protocol::{Command, Event};

    use super::*;
    use crate::controller::Controller;

    fn state() -> (AppState, Receiver<Command>) {
        let (tx, rx) = mpsc::channel();
        (AppState::new(Controller::new(tx, None), "scripted"), rx)
    }

    fn ready(state: &mut AppState, rx: &Receiver<Command>) {
        state.controller.handle_event(Event::Checked { acceleration_available: true });
        state.controller.load().unwrap();
        state.controller.handle_event(Event::Ready);
        rx.try_iter().for_each(drop);
    }

    fn type_text(state: &mut AppState, text: &str) {
        for c in text.chars() {
            apply_action(state, Action::InputChar(c));
        }
    }

    #[test]
    fn editing_handles_multibyte_chars() {
        let (mut s, _rx) = state();
        type_text(&mut s, "día");
        apply_action(&mut s, Action::CursorLeft);
        apply_action(&mut s, Action::InputBackspace);
        assert_eq!(s.input, "da");
        apply_action(&mut s, Action::CursorEnd);
        apply_action(&mut s, Action::PasteText("s!".into()));
        assert_eq!(s.input, "das!");
        assert_eq!(s.input_cursor, s.input.len());
    }

    #[test]
    fn submit_sends_generate_and_clears_input() {
        let (mut s, rx) = state();
        ready(&mut s, &rx);
        type_text(&mut s, "hello");
        apply_action(&mut s, Action::InputSubmit);

        assert!(s.input.is_empty());
        assert!(matches!(rx.try_recv().unwrap(), Command::Generate(_)));
        assert!(s.controller.is_generating());
    }

    #[test]
    fn refused_submit_keeps_input_and_explains() {
        let (mut s, _rx) = state();
        type_text(&mut s, "hello");
        apply_action(&mut s, Action::InputSubmit);
        assert_eq!(s.input, "hello");
        assert!(s.notice.as_deref().unwrap_or_default().contains("cannot generate"));
    }

    #[test]
    fn submit_while_generating_defers() {
        let (mut s, rx) = state();
        ready(&mut s, &rx);
        type_text(&mut s, "one");
        apply_action(&mut s, Action::InputSubmit);
        type_text(&mut s, "two");
        apply_action(&mut s, Action::InputSubmit);

        assert_eq!(s.notice.as_deref(), Some(DEFAULTS.messages.deferred.as_str()));
        assert_eq!(rx.try_iter().filter(|c| matches!(c, Command::Generate(_))).count(), 1);
    }

    #[test]
    fn unknown_command_sets_notice() {
        let (mut s, _rx) = state();
        type_text(&mut s, "/warp");
        apply_action(&mut s, Action::InputSubmit);
        assert_eq!(s.notice.as_deref(), Some("unknown command /warp"));
    }

    #[test]
    fn load_before_check_is_refused() {
        let (mut s, rx) = state();
        apply_action(&mut s, Action::Load);
        assert!(rx.try_recv().is_err());
        assert!(s.notice.is_some());
    }

    #[test]
    fn load_action_sends_load_after_check() {
        let (mut s, rx) = state();
        s.controller.handle_event(Event::Checked { acceleration_available: true });
        s.notice = Some("stale".into());
        apply_action(&mut s, Action::Load);
        assert!(matches!(rx.try_recv().unwrap(), Command::Load));
        assert_eq!(s.notice, None);
    }

    #[test]
    fn interrupt_action_stops_the_running_reply() {
        let (mut s, rx) = state();
        ready(&mut s, &rx);
        type_text(&mut s, "hi");
        apply_action(&mut s, Action::InputSubmit);
        assert!(matches!(rx.try_recv().unwrap(), Command::Generate(_)));

        assert_eq!(apply_action(&mut s, Action::Interrupt), ActionResult::Redraw);
        assert!(matches!(rx.try_recv().unwrap(), Command::Interrupt));
        assert_eq!(s.notice, None);
    }

    #[test]
    fn scrolling_saturates() {
        let (mut s, _rx) = state();
        apply_action(&mut s, Action::ScrollDown(5));
        assert_eq!(s.scroll_offset, 0);
        apply_action(&mut s, Action::ScrollUp(3));
        assert_eq!(s.scroll_offset, 3);
        assert_eq!(apply_action(&mut s, Action::None), ActionResult::Nothing);
    }
}
