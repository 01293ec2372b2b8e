//! Foreground side of the session protocol.
//!
//! The controller owns the conversation, the progress table and the session
//! state. It issues commands over a channel and folds worker events back in
//! through [`Controller::handle_event`]. It never blocks on the worker.

mod events;
mod generation;


use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use offload_base::config::DEFAULTS;
use offload_base::conversation::{ContentPart, ConversationTurn};
use offload_base::progress::ProgressAggregator;
use offload_base::protocol::{Command, ErrorKind, StopReason};
use offload_base::state::{GenerationPhase, SessionState};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("acceleration has not been checked yet")]
    NotChecked,
    #[error("hardware acceleration is unavailable")]
    CapabilityUnavailable,
    #[error("session is {} and cannot generate", .0.label())]
    NotReady(SessionState),
    #[error("a generation is already in flight")]
    GenerationInFlight,
    #[error("nothing to send")]
    EmptyInput,
    #[error("no deferred message to send")]
    NothingPending,
    #[error("worker channel closed")]
    ChannelClosed,
}

/// Last failure surfaced to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    pub kind: ErrorKind,
    pub message: String,
}

/// What `submit` did with the user's turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Generate was sent
    Sent,
    /// Stored in the conversation; send later with `send_pending`
    Deferred,
}

pub struct Controller {
    commands: Sender<Command>,
    pub state: SessionState,
    pub phase: GenerationPhase,
    pub conversation: Vec<ConversationTurn>,
    pub progress: ProgressAggregator,
    /// `None` until the first `Checked`
    pub acceleration: Option<bool>,
    pub status_message: Option<String>,
    pub last_error: Option<SessionError>,
    pub tokens_so_far: usize,
    pub tokens_per_second: Option<f64>,
    pub last_stop_reason: Option<StopReason>,
    /// Index of the assistant turn receiving the current stream
    placeholder: Option<usize>,
    /// User turns added while a generation was running
    deferred: bool,
    /// Swallow events until the abandoned generation's terminal event
    draining: bool,
    generation_started: Option<Instant>,
    timeout: Option<Duration>,
}

impl Controller {
    pub fn new(commands: Sender<Command>, timeout: Option<Duration>) -> Self {
        Self {
            commands,
            state: SessionState::Uninitialized,
            phase: GenerationPhase::Idle,
            conversation: Vec::new(),
            progress: ProgressAggregator::new(),
            acceleration: None,
            status_message: None,
            last_error: None,
            tokens_so_far: 0,
            tokens_per_second: None,
            last_stop_reason: None,
            placeholder: None,
            deferred: false,
            draining: false,
            generation_started: None,
            timeout,
        }
    }

    /// True from Generate until the worker's terminal event, including an
    /// abandoned generation that is still draining
    pub fn is_generating(&self) -> bool {
        self.phase.is_active() || self.draining
    }

    /// Index of the assistant turn receiving the current stream
    pub fn streaming_turn(&self) -> Option<usize> {
        self.placeholder
    }

    pub fn has_deferred(&self) -> bool {
        self.deferred
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    fn send(&mut self, command: Command) -> Result<(), ControllerError> {
        debug!(command = command.name(), "sending command");
        if self.commands.send(command).is_err() {
            self.on_channel_closed();
            return Err(ControllerError::ChannelClosed);
        }
        Ok(())
    }

    pub fn check(&mut self) -> Result<(), ControllerError> {
        self.state = SessionState::Checking;
        self.status_message = Some(DEFAULTS.messages.checking.clone());
        self.send(Command::Check)
    }

    /// Start loading. A no-op while loading or once ready.
    pub fn load(&mut self) -> Result<(), ControllerError> {
        match self.acceleration {
            None => return Err(ControllerError::NotChecked),
            Some(false) => return Err(ControllerError::CapabilityUnavailable),
            Some(true) => {}
        }
        if matches!(self.state, SessionState::Loading | SessionState::Ready) {
            debug!(state = self.state.label(), "load ignored");
            return Ok(());
        }
        if self.state == SessionState::Error
            && self.last_error.as_ref().is_some_and(|e| e.kind == ErrorKind::ChannelFailure)
        {
            return Err(ControllerError::ChannelClosed);
        }
        info!("load requested");
        self.state = SessionState::Loading;
        self.last_error = None;
        self.progress.clear();
        self.send(Command::Load)
    }

    /// Add a user turn and, when idle, generate a reply to it.
    pub fn submit(&mut self, parts: Vec<ContentPart>) -> Result<Submission, ControllerError> {
        let turn = ConversationTurn::user(parts);
        if !turn.has_text() && !turn.has_image() {
            return Err(ControllerError::EmptyInput);
        }
        if self.is_generating() {
            // After the open reply, so history stays in question/answer order
            self.conversation.push(turn);
            self.deferred = true;
            debug!("user turn deferred until the current reply finishes");
            return Ok(Submission::Deferred);
        }
        if self.state != SessionState::Ready {
            return Err(ControllerError::NotReady(self.state));
        }
        self.conversation.push(turn);
        self.start_generation()?;
        Ok(Submission::Sent)
    }

    /// Generate a reply to turns that arrived during the previous generation
    pub fn send_pending(&mut self) -> Result<(), ControllerError> {
        if !self.deferred {
            return Err(ControllerError::NothingPending);
        }
        if self.state != SessionState::Ready {
            return Err(ControllerError::NotReady(self.state));
        }
        self.start_generation()
    }

    /// Ask the worker to stop the current generation. A no-op when idle.
    pub fn interrupt(&mut self) -> Result<(), ControllerError> {
        if !self.phase.is_active() {
            return Ok(());
        }
        info!("interrupt requested");
        self.send(Command::Interrupt)
    }

    /// Start a fresh cycle. The worker keeps its loaded engine.
    pub fn reset(&mut self) -> Result<(), ControllerError> {
        if self.phase.is_active() {
            self.send(Command::Interrupt)?;
        }
        self.draining = self.is_generating();
        self.conversation.clear();
        self.progress.clear();
        self.placeholder = None;
        self.phase = GenerationPhase::Idle;
        self.deferred = false;
        self.generation_started = None;
        self.tokens_so_far = 0;
        self.tokens_per_second = None;
        self.last_stop_reason = None;
        info!("reset requested");
        self.send(Command::Reset)
    }

    pub fn clear_conversation(&mut self) -> Result<(), ControllerError> {
        if self.is_generating() {
            return Err(ControllerError::GenerationInFlight);
        }
        self.conversation.clear();
        self.deferred = false;
        Ok(())
    }

    /// The worker is unreachable; nothing more can happen in this session.
    pub fn on_channel_closed(&mut self) {
        warn!("worker channel closed");
        let message = "inference worker stopped responding".to_string();
        if self.phase.is_active() {
            self.fail_generation(&message);
        }
        self.draining = false;
        self.state = SessionState::Error;
        self.last_error = Some(SessionError { kind: ErrorKind::ChannelFailure, message });
    }

    /// Time left before the running generation times out
    pub fn timeout_remaining(&self, now: Instant) -> Option<Duration> {
        let started = self.generation_started?;
        let timeout = self.timeout?;
        Some(timeout.saturating_sub(now.saturating_duration_since(started)))
    }
}
