use offload_base::state::SessionState;

use crate::controller::Controller;

/// Everything the UI renders: the session plus the input line
pub struct AppState {
    pub controller: Controller,
    /// Shown in the status bar
    pub engine_name: String,
    pub input: String,
    /// Byte offset into `input`
    pub input_cursor: usize,
    /// Lines scrolled up from the bottom of the conversation
    pub scroll_offset: u16,
    /// One-line feedback under the conversation (command errors, hints)
    pub notice: Option<String>,
    pub spinner_frame: usize,
    pub dirty: bool,
}

impl AppState {
    pub fn new(controller: Controller, engine_name: impl Into<String>) -> Self {
        Self {
            controller,
            engine_name: engine_name.into(),
            input: String::new(),
            input_cursor: 0,
            scroll_offset: 0,
            notice: None,
            spinner_frame: 0,
            dirty: true,
        }
    }

    /// Loading, thinking or streaming: anything that animates
    pub fn is_busy(&self) -> bool {
        self.controller.is_generating() || self.controller.state == SessionState::Loading
    }
}
