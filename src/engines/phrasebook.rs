use std::collections::HashMap;

use tracing::{debug, info};

use offload_base::config::{DEFAULTS, PhrasebookConfig};
use offload_base::conversation::{ConversationTurn, last_user_turn};
use offload_base::engine::{Engine, EngineError, GenerationOutput, LoadProgress, TaskKind, TokenMetrics};
use offload_base::interrupt::StopSignal;

use super::{EOS_TOKEN, simulate_download, stream_chunks, word_chunks};
use crate::infra::config::EngineSettings;

const TRANSLATE_PREFIX: &str = "translate:";

/// English to Spanish, word by word, from the configured dictionary
pub struct PhrasebookEngine {
    settings: EngineSettings,
    book: PhrasebookConfig,
    loaded: bool,
}

impl PhrasebookEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings, book: DEFAULTS.phrasebook.clone(), loaded: false }
    }

    #[cfg(test)]
    fn with_book(settings: EngineSettings, book: PhrasebookConfig) -> Self {
        Self { settings, book, loaded: false }
    }

    fn translate(&self, text: &str) -> String {
        let trimmed = text.trim();
        let body = match trimmed.get(..TRANSLATE_PREFIX.len()) {
            Some(head) if head.eq_ignore_ascii_case(TRANSLATE_PREFIX) => &trimmed[TRANSLATE_PREFIX.len()..],
            _ => trimmed,
        };
        body.split_whitespace().map(|word| translate_word(&self.book.entries, word)).collect::<Vec<_>>().join(" ")
    }
}

/// Look up `word` ignoring case and surrounding punctuation, keeping both
fn translate_word(entries: &HashMap<String, String>, word: &str) -> String {
    let start = word.find(|c: char| c.is_alphanumeric()).unwrap_or(word.len());
    let end = word.rfind(|c: char| c.is_alphanumeric()).map(|i| i + word[i..].chars().next().map_or(1, char::len_utf8));
    let end = end.unwrap_or(start).max(start);
    let (lead, core, trail) = (&word[..start], &word[start..end], &word[end..]);

    let Some(translated) = entries.get(&core.to_lowercase()) else {
        return word.to_string();
    };
    let capitalized = core.chars().next().is_some_and(char::is_uppercase);
    format!("{}{}{}", lead, if capitalized { capitalize(translated) } else { translated.clone() }, trail)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Engine for PhrasebookEngine {
    fn name(&self) -> &str {
        "phrasebook"
    }

    fn task(&self) -> TaskKind {
        TaskKind::Text
    }

    fn check_acceleration(&mut self) -> Result<bool, EngineError> {
        Ok(self.settings.acceleration)
    }

    fn load(&mut self, on_progress: &mut dyn FnMut(LoadProgress)) -> Result<(), EngineError> {
        if !self.settings.acceleration {
            return Err(EngineError::AccelerationUnavailable("no compatible adapter found".into()));
        }
        simulate_download(&self.book.weights, self.book.chunk_bytes, self.settings.step_delay_ms, on_progress);
        self.loaded = true;
        info!(entries = self.book.entries.len(), "phrasebook loaded");
        Ok(())
    }

    fn generate(
        &mut self,
        turns: &[ConversationTurn],
        on_token: &mut dyn FnMut(&str, TokenMetrics),
        stop: &StopSignal,
    ) -> Result<GenerationOutput, EngineError> {
        if !self.loaded {
            return Err(EngineError::NotLoaded);
        }
        let source = last_user_turn(turns).map(ConversationTurn::text).unwrap_or_default();
        let translation = self.translate(&source);
        debug!(source_len = source.len(), "translating");

        let mut chunks = word_chunks(&translation);
        chunks.push(EOS_TOKEN.to_string());
        Ok(stream_chunks(&chunks, &self.settings, on_token, stop))
    }
}
