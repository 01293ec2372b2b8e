//! Vision-to-text reference engine.
//!
//! Reads the image header only: container format, pixel dimensions and byte
//! size become a one-sentence description.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use tracing::{debug, info};

use offload_base::config::{CaptionConfig, DEFAULTS};
use offload_base::conversation::{ConversationTurn, last_user_turn};
use offload_base::engine::{Engine, EngineError, GenerationOutput, LoadProgress, TaskKind, TokenMetrics};
use offload_base::format::format_bytes;
use offload_base::interrupt::StopSignal;

use super::{EOS_TOKEN, simulate_download, stream_chunks, word_chunks};
use crate::infra::config::EngineSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    /// `None` when the bytes match no known container
    pub format: Option<ImageFormat>,
    /// (width, height) when the header could be parsed
    pub dimensions: Option<(u32, u32)>,
    pub bytes: usize,
}

pub fn sniff(data: &[u8]) -> ImageInfo {
    let reader = match ImageReader::new(Cursor::new(data)).with_guessed_format() {
        Ok(reader) => reader,
        Err(e) => {
            debug!(error = %e, "failed to guess image format");
            return ImageInfo { format: None, dimensions: None, bytes: data.len() };
        }
    };
    let format = reader.format();
    let dimensions = match reader.into_dimensions() {
        Ok(dimensions) => Some(dimensions),
        Err(e) => {
            debug!(error = %e, "image header unreadable");
            None
        }
    };
    ImageInfo { format, dimensions, bytes: data.len() }
}

fn format_label(format: Option<ImageFormat>) -> String {
    match format {
        None => "unrecognized".to_string(),
        Some(ImageFormat::Jpeg) => "JPEG".to_string(),
        Some(ImageFormat::WebP) => "WebP".to_string(),
        Some(other) => other
            .extensions_str()
            .first()
            .map_or_else(|| format!("{:?}", other), |ext| ext.to_uppercase()),
    }
}

pub fn describe(info: &ImageInfo) -> String {
    let article = if info.format.is_none() { "An" } else { "A" };
    let label = format_label(info.format);
    let size = format_bytes(info.bytes as u64);
    match info.dimensions {
        Some((w, h)) => format!("{} {} image, {}x{} pixels ({}, {}).", article, label, w, h, orientation(w, h), size),
        None => format!("{} {} image of {}.", article, label, size),
    }
}

fn orientation(w: u32, h: u32) -> &'static str {
    match w.cmp(&h) {
        std::cmp::Ordering::Greater => "landscape",
        std::cmp::Ordering::Less => "portrait",
        std::cmp::Ordering::Equal => "square",
    }
}

pub struct CaptionEngine {
    settings: EngineSettings,
    config: CaptionConfig,
    loaded: bool,
}

impl CaptionEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings, config: DEFAULTS.caption.clone(), loaded: false }
    }
}

impl Engine for CaptionEngine {
    fn name(&self) -> &str {
        "caption"
    }

    fn task(&self) -> TaskKind {
        TaskKind::VisionToText
    }

    fn check_acceleration(&mut self) -> Result<bool, EngineError> {
        Ok(self.settings.acceleration)
    }

    fn load(&mut self, on_progress: &mut dyn FnMut(LoadProgress)) -> Result<(), EngineError> {
        if !self.settings.acceleration {
            return Err(EngineError::AccelerationUnavailable("no compatible adapter found".into()));
        }
        simulate_download(&self.config.weights, self.config.chunk_bytes, self.settings.step_delay_ms, on_progress);
        self.loaded = true;
        info!("caption model loaded");
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
        let image = last_user_turn(turns)
            .and_then(|turn| turn.images().next())
            .ok_or_else(|| EngineError::Generation("no image in request".into()))?;
        let info = sniff(image);
        debug!(format = ?info.format, bytes = info.bytes, "describing image");

        let mut chunks = word_chunks(&describe(&info));
        chunks.push(EOS_TOKEN.to_string());
        Ok(stream_chunks(&chunks, &self.settings, on_token, stop))
    }
}
