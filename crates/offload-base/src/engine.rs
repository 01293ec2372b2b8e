//! Engine capability boundary.
//!
//! An engine loads a model and turns conversations into tokens. The session
//! worker is the only caller; implementations never see the controller.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::{ConversationTurn, last_user_turn};
use crate::interrupt::StopSignal;
use crate::protocol::{ErrorKind, StopReason};

/// What an engine consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Text in, text out (e.g. translation)
    Text,
    /// Image (plus optional text) in, text out
    VisionToText,
}

/// Typed load progress, relayed 1:1 into protocol events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadProgress {
    Status(String),
    Init { task_id: String, total_bytes: Option<u64> },
    Update { task_id: String, loaded_bytes: u64, total_bytes: Option<u64> },
    Done { task_id: String },
}

/// Per-token metrics an engine may report
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TokenMetrics {
    pub tokens_per_second: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutput {
    /// Fully decoded output; `None` leaves the streamed concatenation as the result
    pub final_text: Option<String>,
    pub stop_reason: StopReason,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("hardware acceleration unavailable: {0}")]
    AccelerationUnavailable(String),
    #[error("model load failed: {0}")]
    Load(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("engine is not loaded")]
    NotLoaded,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::AccelerationUnavailable(_) => ErrorKind::CapabilityUnavailable,
            EngineError::Load(_) => ErrorKind::LoadFailure,
            EngineError::Generation(_) => ErrorKind::GenerationFailure,
            EngineError::NotLoaded => ErrorKind::ValidationFailure,
        }
    }
}

/// Trait for inference engines
pub trait Engine: Send {
    /// Human-readable name for status display and logs
    fn name(&self) -> &str;

    fn task(&self) -> TaskKind;

    /// Check for hardware acceleration without allocating the model
    fn check_acceleration(&mut self) -> Result<bool, EngineError>;

    /// Fetch weights and initialize. Called at most once per successful load.
    fn load(&mut self, on_progress: &mut dyn FnMut(LoadProgress)) -> Result<(), EngineError>;

    /// Generate a reply to the most recent user turn.
    ///
    /// `on_token` receives incremental chunks. Implementations must check `stop`
    /// between steps and return `StopReason::Interrupted` when it fires.
    fn generate(
        &mut self,
        turns: &[ConversationTurn],
        on_token: &mut dyn FnMut(&str, TokenMetrics),
        stop: &StopSignal,
    ) -> Result<GenerationOutput, EngineError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no user turn to respond to")]
    NoUserTurn,
    #[error("the latest user turn has no content")]
    EmptyContent,
    #[error("this model needs an image to describe")]
    MissingImage,
    #[error("this model needs non-empty text")]
    MissingText,
}

/// Check that the latest user turn carries content the engine can consume
pub fn validate_request(task: TaskKind, turns: &[ConversationTurn]) -> Result<(), ValidationError> {
    let turn = last_user_turn(turns).ok_or(ValidationError::NoUserTurn)?;
    if turn.content.is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    match task {
        TaskKind::VisionToText if !turn.has_image() => Err(ValidationError::MissingImage),
        TaskKind::Text if !turn.has_text() => Err(ValidationError::MissingText),
        _ => Ok(()),
    }
}

static SPECIAL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\|[^|>]*\|>|</?s>|<pad>|<unk>").expect("special token pattern"));

/// Remove tokenizer control tokens from decoded text
pub fn strip_special_tokens(text: &str) -> String {
    SPECIAL_TOKEN.replace_all(text, "").trim().to_string()
}
