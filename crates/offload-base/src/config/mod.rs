//! YAML defaults for engines, controller and user-facing messages.
use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

pub mod constants;

// ============================================================================
// Engine Selection
// ============================================================================

/// Available reference engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Dictionary-backed text translation
    #[default]
    Phrasebook,
    /// Image header description (vision-to-text)
    Caption,
}

impl EngineKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            EngineKind::Phrasebook => "Phrasebook (en→es)",
            EngineKind::Caption => "Caption (image→text)",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "phrasebook" | "translate" | "translation" => Some(EngineKind::Phrasebook),
            "caption" | "vision" => Some(EngineKind::Caption),
            _ => None,
        }
    }
}

// ============================================================================
// Defaults Configuration
// ============================================================================

#[derive(Debug, Deserialize, Clone)]
pub struct Defaults {
    pub engine: EngineDefaults,
    pub controller: ControllerDefaults,
    pub messages: Messages,
    pub phrasebook: PhrasebookConfig,
    pub caption: CaptionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineDefaults {
    pub kind: EngineKind,
    /// Simulated acceleration check result
    pub acceleration: bool,
    /// Delay between generation steps and download chunks
    pub step_delay_ms: u64,
    pub max_new_tokens: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ControllerDefaults {
    #[serde(default)]
    pub generation_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Messages {
    pub checking: String,
    pub loading: String,
    pub ready: String,
    pub capability_unavailable: String,
    /// `{message}` is replaced with the error text
    pub error_marker: String,
    pub deferred: String,
}

impl Messages {
    pub fn error_marker(&self, message: &str) -> String {
        self.error_marker.replace("{message}", message)
    }
}

/// One simulated weight file
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct WeightFile {
    pub file: String,
    /// `None` when the server does not announce a size
    #[serde(default)]
    pub bytes: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PhrasebookConfig {
    pub chunk_bytes: u64,
    pub weights: Vec<WeightFile>,
    pub entries: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CaptionConfig {
    pub chunk_bytes: u64,
    pub weights: Vec<WeightFile>,
}

// ============================================================================
// Loading Functions
// ============================================================================

fn parse_yaml<T: for<'de> Deserialize<'de>>(name: &str, content: &str) -> T {
    serde_yaml::from_str(content).unwrap_or_else(|e| panic!("Failed to parse {}: {}", name, e))
}

// ============================================================================
// Global Configuration (Lazy Static, embedded at compile time)
// ============================================================================

pub static DEFAULTS: LazyLock<Defaults> =
    LazyLock::new(|| parse_yaml("defaults.yaml", include_str!("../../../../yamls/defaults.yaml")));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse() {
        let d = &*DEFAULTS;
        assert_eq!(d.engine.kind, EngineKind::Phrasebook);
        assert!(d.controller.generation_timeout_ms.is_none());
        assert_eq!(d.phrasebook.entries.get("hello").map(String::as_str), Some("hola"));
        assert!(d.phrasebook.weights.iter().any(|w| w.bytes.is_none()));
        assert!(!d.caption.weights.is_empty());
    }

    #[test]
    fn error_marker_substitutes_message() {
        assert_eq!(DEFAULTS.messages.error_marker("oom"), "[Generation failed: oom]");
    }

    #[test]
    fn engine_kind_aliases() {
        assert_eq!(EngineKind::parse("Vision"), Some(EngineKind::Caption));
        assert_eq!(EngineKind::parse("translate"), Some(EngineKind::Phrasebook));
        assert_eq!(EngineKind::parse("gpt"), None);
    }
}
