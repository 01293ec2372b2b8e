//! Reference engines.
//!
//! Both simulate a weight download with byte-level progress and stream their
//! output one word at a time so the whole protocol can be exercised without
//! real model files.

pub mod caption;
pub mod phrasebook;
#[cfg(test)]
pub mod scripted;

use std::thread;
use std::time::Duration;

use offload_base::config::{EngineKind, WeightFile};
use offload_base::engine::{Engine, GenerationOutput, LoadProgress, TokenMetrics, strip_special_tokens};
use offload_base::interrupt::StopSignal;
use offload_base::protocol::StopReason;

use crate::infra::config::EngineSettings;

/// End-of-sequence marker the reference engines emit as their last chunk
pub const EOS_TOKEN: &str = "</s>";

/// Steps used to fake a download whose size the server did not announce
const UNSIZED_STEPS: u64 = 3;

pub fn get_engine(settings: &EngineSettings) -> Box<dyn Engine> {
    match settings.kind {
        EngineKind::Phrasebook => Box::new(phrasebook::PhrasebookEngine::new(settings.clone())),
        EngineKind::Caption => Box::new(caption::CaptionEngine::new(settings.clone())),
    }
}

fn pause(delay_ms: u64) {
    if delay_ms > 0 {
        thread::sleep(Duration::from_millis(delay_ms));
    }
}

/// Report each weight file as Init, a series of Updates, then Done
pub(crate) fn simulate_download(
    weights: &[WeightFile],
    chunk_bytes: u64,
    delay_ms: u64,
    on_progress: &mut dyn FnMut(LoadProgress),
) {
    let chunk_bytes = chunk_bytes.max(1);
    for weight in weights {
        let task_id = weight.file.clone();
        on_progress(LoadProgress::Status(format!("Fetching {}", weight.file)));
        on_progress(LoadProgress::Init { task_id: task_id.clone(), total_bytes: weight.bytes });
        match weight.bytes {
            Some(total) => {
                let mut loaded = 0;
                while loaded < total {
                    pause(delay_ms);
                    loaded = (loaded + chunk_bytes).min(total);
                    on_progress(LoadProgress::Update { task_id: task_id.clone(), loaded_bytes: loaded, total_bytes: Some(total) });
                }
            }
            None => {
                for step in 1..=UNSIZED_STEPS {
                    pause(delay_ms);
                    on_progress(LoadProgress::Update {
                        task_id: task_id.clone(),
                        loaded_bytes: step * chunk_bytes,
                        total_bytes: None,
                    });
                }
            }
        }
        on_progress(LoadProgress::Done { task_id });
    }
}

/// Emit `chunks` one step at a time.
///
/// Stops early on interrupt or once `max_new_tokens` chunks went out. The
/// final text is the concatenation with control tokens removed.
pub(crate) fn stream_chunks(
    chunks: &[String],
    settings: &EngineSettings,
    on_token: &mut dyn FnMut(&str, TokenMetrics),
    stop: &StopSignal,
) -> GenerationOutput {
    let mut produced = String::new();
    let mut stop_reason = StopReason::Finished;
    for (emitted, chunk) in chunks.iter().enumerate() {
        if emitted >= settings.max_new_tokens {
            stop_reason = StopReason::MaxTokens;
            break;
        }
        pause(settings.step_delay_ms);
        if stop.should_stop() {
            stop_reason = StopReason::Interrupted;
            break;
        }
        on_token(chunk, TokenMetrics::default());
        produced.push_str(chunk);
    }
    GenerationOutput { final_text: Some(strip_special_tokens(&produced)), stop_reason }
}

/// Split text into word chunks, each after the first carrying its leading space
pub(crate) fn word_chunks(text: &str) -> Vec<String> {
    text.split_whitespace()
        .enumerate()
        .map(|(i, word)| if i == 0 { word.to_string() } else { format!(" {}", word) })
        .collect()
}

#[cfg(test)]
mod tests {
    use offload_base::interrupt::InterruptRegistry;

    use super::*;

    fn settings(max_new_tokens: usize) -> EngineSettings {
        EngineSettings { kind: EngineKind::Phrasebook, acceleration: true, step_delay_ms: 0, max_new_tokens }
    }

    fn collect(weights: &[WeightFile], chunk: u64) -> Vec<LoadProgress> {
        let mut seen = Vec::new();
        simulate_download(weights, chunk, 0, &mut |p| seen.push(p));
        seen
    }

    #[test]
    fn sized_download_ends_at_total() {
        let seen = collect(&[WeightFile { file: "w".into(), bytes: Some(100) }], 40);
        let updates: Vec<u64> = seen
            .iter()
            .filter_map(|p| match p {
                LoadProgress::Update { loaded_bytes, .. } => Some(*loaded_bytes),
                _ => None,
            })
            .collect();
        assert_eq!(updates, vec![40, 80, 100]);
        assert_eq!(seen.last(), Some(&LoadProgress::Done { task_id: "w".into() }));
    }

    #[test]
    fn unsized_download_reports_no_total() {
        let seen = collect(&[WeightFile { file: "tok".into(), bytes: None }], 10);
        assert!(seen.contains(&LoadProgress::Init { task_id: "tok".into(), total_bytes: None }));
        assert!(seen.iter().all(|p| !matches!(p, LoadProgress::Update { total_bytes: Some(_), .. })));
    }

    #[test]
    fn word_chunks_keep_spacing() {
        assert_eq!(word_chunks("Hola  mundo"), vec!["Hola".to_string(), " mundo".to_string()]);
        assert!(word_chunks("   ").is_empty());
    }

    #[test]
    fn stream_strips_control_tokens() {
        let chunks = word_chunks("Hola mundo </s>");
        let mut streamed = Vec::new();
        let out = stream_chunks(&chunks, &settings(16), &mut |c, _| streamed.push(c.to_string()), &StopSignal::never());
        assert_eq!(streamed.len(), 3);
        assert_eq!(out.final_text.as_deref(), Some("Hola mundo"));
        assert_eq!(out.stop_reason, StopReason::Finished);
    }

    #[test]
    fn stream_respects_token_limit() {
        let out = stream_chunks(&word_chunks("a b c d"), &settings(2), &mut |_, _| {}, &StopSignal::never());
        assert_eq!(out.final_text.as_deref(), Some("a b"));
        assert_eq!(out.stop_reason, StopReason::MaxTokens);
    }

    #[test]
    fn stream_stops_when_interrupted() {
        let registry = InterruptRegistry::new();
        let stop = registry.signal(registry.submit());
        registry.interrupt();
        let mut count = 0;
        let out = stream_chunks(&word_chunks("a b"), &settings(16), &mut |_, _| count += 1, &stop);
        assert_eq!(count, 0);
        assert_eq!(out.stop_reason, StopReason::Interrupted);
    }
}
