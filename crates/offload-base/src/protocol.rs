//! Message types exchanged between the controller and the session worker.
//!
//! Commands flow foreground → worker, events flow worker → foreground.
//! Both are plain values: they are moved across the channel and consumed once.

use serde::{Deserialize, Serialize};

use crate::conversation::ConversationTurn;

/// Command sent from the controller to the session worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Command {
    /// Check hardware acceleration without allocating the model
    Check,
    /// Download and initialize the model (idempotent)
    Load,
    /// Run one generation over the given conversation
    Generate(Vec<ConversationTurn>),
    /// Ask the in-flight generation to stop at the next step boundary
    Interrupt,
    /// Clear interrupt state; keeps the loaded engine
    Reset,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Check => "check",
            Command::Load => "load",
            Command::Generate(_) => "generate",
            Command::Interrupt => "interrupt",
            Command::Reset => "reset",
        }
    }
}

/// Why a generation ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    #[default]
    Finished,
    Interrupted,
    MaxTokens,
}

impl StopReason {
    pub fn label(&self) -> &'static str {
        match self {
            StopReason::Finished => "FINISHED",
            StopReason::Interrupted => "INTERRUPTED",
            StopReason::MaxTokens => "MAX_TOKENS",
        }
    }
}

/// Failure taxonomy carried by `Event::Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No acceleration hardware. Fatal until the environment changes.
    CapabilityUnavailable,
    /// Download or initialization failed. Retry with `Load`.
    LoadFailure,
    /// Malformed or empty request. Caller-fixable.
    ValidationFailure,
    /// The engine failed during inference. Retry without reload.
    GenerationFailure,
    /// The worker is unreachable. The worker must be recreated.
    ChannelFailure,
}

impl ErrorKind {
    /// Blocking kinds need an explicit user action before the session is usable again.
    pub fn is_blocking(&self) -> bool {
        matches!(self, ErrorKind::CapabilityUnavailable | ErrorKind::LoadFailure | ErrorKind::ChannelFailure)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::CapabilityUnavailable => "capability unavailable",
            ErrorKind::LoadFailure => "load failure",
            ErrorKind::ValidationFailure => "validation failure",
            ErrorKind::GenerationFailure => "generation failure",
            ErrorKind::ChannelFailure => "channel failure",
        }
    }
}

/// Event emitted by the session worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Checked {
        acceleration_available: bool,
    },
    Loading {
        message: String,
    },
    ProgressInit {
        task_id: String,
        total_bytes: Option<u64>,
    },
    ProgressUpdate {
        task_id: String,
        loaded_bytes: u64,
        total_bytes: Option<u64>,
    },
    ProgressDone {
        task_id: String,
    },
    Ready,
    GenerationStarted,
    /// Incremental chunk, never the accumulated text
    TokenProduced {
        text: String,
        tokens_so_far: usize,
        tokens_per_second: Option<f64>,
    },
    /// `final_text`, when present, is authoritative over the streamed concatenation
    GenerationComplete {
        final_text: Option<String>,
        #[serde(default)]
        stop_reason: StopReason,
    },
    Error {
        message: String,
        kind: Option<ErrorKind>,
    },
    ResetComplete {
        engine_ready: bool,
    },
}

impl Event {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Event::Error { message: message.into(), kind: Some(kind) }
    }

    /// True for the events that close a generation stream
    pub fn is_generation_terminal(&self) -> bool {
        matches!(self, Event::GenerationComplete { .. } | Event::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ContentPart, ConversationTurn};

    #[test]
    fn event_json_is_tagged() {
        let evt = Event::ProgressUpdate { task_id: "weights".into(), loaded_bytes: 50, total_bytes: Some(100) };
        let json = serde_json::to_value(&evt).unwrap();
        assert_eq!(json["type"], "progress_update");
        assert_eq!(json["task_id"], "weights");
        assert_eq!(json["loaded_bytes"], 50);
    }

    #[test]
    fn generation_complete_defaults_stop_reason() {
        let evt: Event = serde_json::from_str(r#"{"type":"generation_complete","final_text":"Hola"}"#).unwrap();
        assert_eq!(evt, Event::GenerationComplete { final_text: Some("Hola".into()), stop_reason: StopReason::Finished });
    }

    #[test]
    fn generate_command_carries_turns() {
        let cmd = Command::Generate(vec![ConversationTurn::user(vec![ContentPart::Text("hi".into())])]);
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "generate");
        assert_eq!(json["payload"][0]["role"], "user");
        assert_eq!(cmd.name(), "generate");
    }

    #[test]
    fn terminal_events() {
        assert!(Event::error(ErrorKind::GenerationFailure, "boom").is_generation_terminal());
        assert!(Event::GenerationComplete { final_text: None, stop_reason: StopReason::Interrupted }
            .is_generation_terminal());
        assert!(!Event::GenerationStarted.is_generation_terminal());
        assert!(!Event::TokenProduced { text: "a".into(), tokens_so_far: 1, tokens_per_second: None }
            .is_generation_terminal());
    }

    #[test]
    fn blocking_kinds() {
        assert!(ErrorKind::CapabilityUnavailable.is_blocking());
        assert!(ErrorKind::LoadFailure.is_blocking());
        assert!(ErrorKind::ChannelFailure.is_blocking());
        assert!(!ErrorKind::ValidationFailure.is_blocking());
        assert!(!ErrorKind::GenerationFailure.is_blocking());
    }
}
