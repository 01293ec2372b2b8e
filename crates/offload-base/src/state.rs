use serde::{Deserialize, Serialize};

/// Session lifecycle as seen by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Uninitialized,
    Checking,
    Loading,
    Ready,
    Error,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "IDLE",
            SessionState::Checking => "CHECKING",
            SessionState::Loading => "LOADING",
            SessionState::Ready => "READY",
            SessionState::Error => "ERROR",
        }
    }
}

/// Generation sub-phase, only meaningful while `Ready`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    #[default]
    Idle,
    /// Generate sent, no token yet
    Thinking,
    /// At least one token received
    Streaming,
}

impl GenerationPhase {
    pub fn is_active(&self) -> bool {
        !matches!(self, GenerationPhase::Idle)
    }
}
