use crossterm::event::{Event, KeyCode, KeyModifiers};

use offload_base::config::constants::{SCROLL_ARROW_AMOUNT, SCROLL_PAGE_AMOUNT};

use crate::app::actions::Action;
use crate::app::state::AppState;

/// Map a terminal event to an action. `None` means quit.
pub fn handle_event(event: &Event, state: &AppState) -> Option<Action> {
    match event {
        Event::Key(key) => {
            let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

            if ctrl {
                match key.code {
                    KeyCode::Char('q') => return None,
                    KeyCode::Char('l') => return Some(Action::ClearConversation),
                    KeyCode::Char('r') => return Some(Action::Reset),
                    _ => return Some(Action::None),
                }
            }

            // Escape stops generation
            if key.code == KeyCode::Esc && state.controller.is_generating() {
                return Some(Action::Interrupt);
            }

            // Shift/Alt+Enter inserts a newline instead of submitting
            let newline = key.modifiers.contains(KeyModifiers::SHIFT) || key.modifiers.contains(KeyModifiers::ALT);
            let action = match key.code {
                KeyCode::Enter if newline => Action::InputChar('\n'),
                KeyCode::Enter => Action::InputSubmit,
                KeyCode::F(5) => Action::Load,
                KeyCode::Char(c) => Action::InputChar(c),
                KeyCode::Backspace => Action::InputBackspace,
                KeyCode::Left => Action::CursorLeft,
                KeyCode::Right => Action::CursorRight,
                KeyCode::Home => Action::CursorHome,
                KeyCode::End => Action::CursorEnd,
                KeyCode::Up => Action::ScrollUp(SCROLL_ARROW_AMOUNT),
                KeyCode::Down => Action::ScrollDown(SCROLL_ARROW_AMOUNT),
                KeyCode::PageUp => Action::ScrollUp(SCROLL_PAGE_AMOUNT),
                KeyCode::PageDown => Action::ScrollDown(SCROLL_PAGE_AMOUNT),
                _ => Action::None,
            };
            Some(action)
        }
        // Terminals may send \r\n or \r instead of \n
        Event::Paste(text) => {
            let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
            Some(Action::PasteText(normalized))
        }
        _ => Some(Action::None),
    }
}
