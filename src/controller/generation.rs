use std::time::Instant;

use tracing::{debug, warn};

use offload_base::config::DEFAULTS;
use offload_base::conversation::ConversationTurn;
use offload_base::protocol::{Command, ErrorKind, StopReason};
use offload_base::state::GenerationPhase;

use super::{Controller, ControllerError, SessionError};

impl Controller {
    /// Send Generate for the current conversation and open a placeholder.
    /// This is the only place a Generate command is issued.
    pub(super) fn start_generation(&mut self) -> Result<(), ControllerError> {
        if self.is_generating() {
            return Err(ControllerError::GenerationInFlight);
        }
        self.send(Command::Generate(self.conversation.clone()))?;
        self.conversation.push(ConversationTurn::placeholder());
        self.placeholder = Some(self.conversation.len() - 1);
        self.phase = GenerationPhase::Thinking;
        self.deferred = false;
        self.tokens_so_far = 0;
        self.tokens_per_second = None;
        self.last_stop_reason = None;
        self.generation_started = Some(Instant::now());
        Ok(())
    }

    pub(super) fn append_token(&mut self, text: &str, tokens_so_far: usize, tokens_per_second: Option<f64>) {
        let Some(turn) = self.placeholder.and_then(|i| self.conversation.get_mut(i)) else {
            warn!("token without an open reply");
            return;
        };
        turn.append_text(text);
        self.phase = GenerationPhase::Streaming;
        self.tokens_so_far = tokens_so_far;
        if tokens_per_second.is_some() {
            self.tokens_per_second = tokens_per_second;
        }
    }

    pub(super) fn finish_generation(&mut self, final_text: Option<String>, stop_reason: StopReason) {
        if let Some(text) = final_text
            && let Some(turn) = self.placeholder.and_then(|i| self.conversation.get_mut(i))
        {
            turn.set_text(text);
        }
        debug!(stop_reason = stop_reason.label(), tokens = self.tokens_so_far, "reply finished");
        self.last_stop_reason = Some(stop_reason);
        self.end_generation();
    }

    /// Replace the open reply with an error marker and go idle
    pub(super) fn fail_generation(&mut self, message: &str) {
        if let Some(turn) = self.placeholder.and_then(|i| self.conversation.get_mut(i)) {
            turn.set_text(DEFAULTS.messages.error_marker(message));
        }
        self.end_generation();
    }

    fn end_generation(&mut self) {
        self.phase = GenerationPhase::Idle;
        self.placeholder = None;
        self.generation_started = None;
    }

    /// Enforce the generation timeout. Returns true when it fired.
    ///
    /// On expiry the worker is told to stop, the reply fails locally and the
    /// rest of that generation's events are discarded.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.phase.is_active() || self.draining {
            return false;
        }
        match self.timeout_remaining(now) {
            Some(remaining) if remaining.is_zero() => {}
            _ => return false,
        }

        let timeout_ms = self.timeout.map_or(0, |t| t.as_millis() as u64);
        warn!(timeout_ms, "generation timed out");
        if self.send(Command::Interrupt).is_err() {
            return true;
        }
        let message = format!("no reply within {} ms", timeout_ms);
        self.fail_generation(&message);
        self.draining = true;
        self.last_error = Some(SessionError { kind: ErrorKind::GenerationFailure, message });
        true
    }
}
