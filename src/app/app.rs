use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossterm::event;
use ratatui::prelude::*;
use tracing::{debug, error};

use offload_base::config::constants::{EVENT_POLL_MS, IDLE_POLL_MS, RENDER_THROTTLE_MS, SPINNER_FRAME_MS};
use offload_base::protocol::Event;

use crate::app::actions::{ActionResult, apply_action};
use crate::app::events::handle_event;
use crate::app::state::AppState;
use crate::infra::logging::log_error;
use crate::ui;

pub struct App {
    pub state: AppState,
    /// Worker events, in emission order
    events: Receiver<Event>,
    /// Where error logs go
    store: PathBuf,
    last_render_ms: u64,
    last_spinner_ms: u64,
    channel_closed: bool,
}

impl App {
    pub fn new(state: AppState, events: Receiver<Event>, store: PathBuf) -> Self {
        Self { state, events, store, last_render_ms: 0, last_spinner_ms: 0, channel_closed: false }
    }

    pub fn run(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
        loop {
            let current_ms = now_ms();

            // === INPUT FIRST ===
            if event::poll(Duration::ZERO)? {
                let evt = event::read()?;
                let Some(action) = handle_event(&evt, &self.state) else {
                    break;
                };
                if apply_action(&mut self.state, action) == ActionResult::Redraw {
                    self.state.dirty = true;
                }

                // Render immediately after input
                if self.state.dirty {
                    terminal.draw(|frame| ui::render(frame, &self.state))?;
                    self.state.dirty = false;
                    self.last_render_ms = current_ms;
                }
            }

            // === BACKGROUND PROCESSING ===
            self.process_worker_events();
            if self.state.controller.tick(Instant::now()) {
                self.state.dirty = true;
            }
            self.update_spinner_animation();

            if self.state.dirty && current_ms.saturating_sub(self.last_render_ms) >= RENDER_THROTTLE_MS {
                terminal.draw(|frame| ui::render(frame, &self.state))?;
                self.state.dirty = false;
                self.last_render_ms = current_ms;
            }

            // Shorter polls while something is moving
            let poll_ms = if self.state.is_busy() || self.state.dirty { EVENT_POLL_MS } else { IDLE_POLL_MS };
            let _ = event::poll(Duration::from_millis(poll_ms))?;
        }

        Ok(())
    }

    /// Drain everything the worker has emitted since the last frame
    pub fn process_worker_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(evt) => {
                    if let Event::Error { message, kind } = &evt {
                        let label = kind.map_or("unclassified", |k| k.label());
                        let path = log_error(&self.store, &format!("[{label}] {message}"));
                        debug!(path = %path.display(), "error logged");
                    }
                    self.state.controller.handle_event(evt);
                    self.state.dirty = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.channel_closed {
                        error!("worker event channel disconnected");
                        self.channel_closed = true;
                        self.state.controller.on_channel_closed();
                        self.state.dirty = true;
                    }
                    break;
                }
            }
        }
    }

    /// Advance the spinner while loading or generating
    fn update_spinner_animation(&mut self) {
        let now = now_ms();
        if now.saturating_sub(self.last_spinner_ms) < SPINNER_FRAME_MS {
            return;
        }
        if self.state.is_busy() {
            self.last_spinner_ms = now;
            self.state.spinner_frame = self.state.spinner_frame.wrapping_add(1);
            self.state.dirty = true;
        }
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}
