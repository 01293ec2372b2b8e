use tracing::{debug, info, warn};

use offload_base::config::DEFAULTS;
use offload_base::protocol::{ErrorKind, Event};
use offload_base::state::SessionState;

use super::{Controller, SessionError};

impl Controller {
    /// Fold one worker event into the session
    pub fn handle_event(&mut self, event: Event) {
        if self.draining && self.swallow_while_draining(&event) {
            return;
        }

        match event {
            Event::Checked { acceleration_available } => {
                info!(acceleration_available, "acceleration checked");
                self.acceleration = Some(acceleration_available);
                if acceleration_available {
                    if self.state == SessionState::Checking {
                        self.state = SessionState::Uninitialized;
                        self.status_message = None;
                    }
                } else {
                    self.state = SessionState::Error;
                    let message = DEFAULTS.messages.capability_unavailable.clone();
                    self.status_message = Some(message.clone());
                    self.last_error = Some(SessionError { kind: ErrorKind::CapabilityUnavailable, message });
                }
            }
            Event::Loading { message } => {
                if self.state != SessionState::Ready {
                    self.state = SessionState::Loading;
                }
                self.status_message = Some(message);
            }
            Event::ProgressInit { task_id, total_bytes } => self.progress.init(&task_id, total_bytes),
            Event::ProgressUpdate { task_id, loaded_bytes, total_bytes } => {
                self.progress.update(&task_id, loaded_bytes, total_bytes)
            }
            Event::ProgressDone { task_id } => self.progress.done(&task_id),
            Event::Ready => {
                info!("session ready");
                self.state = SessionState::Ready;
                self.status_message = Some(DEFAULTS.messages.ready.clone());
                self.last_error = None;
            }
            Event::GenerationStarted => {
                if !self.phase.is_active() {
                    warn!("generation started without a pending request");
                }
            }
            Event::TokenProduced { text, tokens_so_far, tokens_per_second } => {
                self.append_token(&text, tokens_so_far, tokens_per_second)
            }
            Event::GenerationComplete { final_text, stop_reason } => {
                if self.phase.is_active() {
                    self.finish_generation(final_text, stop_reason);
                } else {
                    warn!("completion without an open reply");
                }
            }
            Event::Error { message, kind } => self.handle_error(message, kind),
            Event::ResetComplete { engine_ready } => {
                info!(engine_ready, "reset complete");
                self.state = if engine_ready {
                    SessionState::Ready
                } else if self.acceleration == Some(false) {
                    SessionState::Error
                } else {
                    SessionState::Uninitialized
                };
                if engine_ready {
                    self.last_error = None;
                }
                self.status_message = None;
            }
        }
    }

    /// Drop events of a generation the controller already gave up on.
    /// Returns false for events that must still be applied.
    fn swallow_while_draining(&mut self, event: &Event) -> bool {
        match event {
            Event::GenerationStarted | Event::TokenProduced { .. } => true,
            Event::GenerationComplete { .. } => {
                debug!("abandoned generation finished");
                self.draining = false;
                true
            }
            Event::Error { kind, .. } if !kind.is_some_and(|k| k.is_blocking()) => {
                debug!("abandoned generation failed");
                self.draining = false;
                true
            }
            _ => false,
        }
    }

    fn handle_error(&mut self, message: String, kind: Option<ErrorKind>) {
        let kind = kind.unwrap_or_else(|| self.infer_error_kind());
        warn!(kind = kind.label(), %message, "worker error");

        match kind {
            ErrorKind::CapabilityUnavailable => {
                self.acceleration = Some(false);
                if self.phase.is_active() {
                    self.fail_generation(&message);
                }
                self.state = SessionState::Error;
            }
            ErrorKind::LoadFailure => {
                self.state = SessionState::Error;
            }
            ErrorKind::ValidationFailure | ErrorKind::GenerationFailure => {
                if self.phase.is_active() {
                    self.fail_generation(&message);
                }
            }
            ErrorKind::ChannelFailure => {
                self.on_channel_closed();
                return;
            }
        }
        self.status_message = Some(message.clone());
        self.last_error = Some(SessionError { kind, message });
    }

    /// Untyped errors are attributed to whatever was in progress
    fn infer_error_kind(&self) -> ErrorKind {
        match self.state {
            SessionState::Checking => ErrorKind::CapabilityUnavailable,
            SessionState::Loading => ErrorKind::LoadFailure,
            _ => ErrorKind::GenerationFailure,
        }
    }
}
