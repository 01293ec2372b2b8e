use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use offload_base::config::DEFAULTS;
use offload_base::conversation::ConversationTurn;
use offload_base::engine::{Engine, EngineError, LoadProgress, TokenMetrics, validate_request};
use offload_base::interrupt::InterruptRegistry;
use offload_base::protocol::{ErrorKind, Event};

use super::hub::EventHub;

/// Work forwarded from the intake thread, in arrival order
#[derive(Debug)]
pub(super) enum Job {
    Check,
    Load,
    Generate { epoch: u64, turns: Vec<ConversationTurn> },
    Reset,
}

/// Owns the engine. Runs one job at a time on the executor thread.
pub(super) struct Executor {
    engine: Box<dyn Engine>,
    hub: EventHub,
    interrupts: InterruptRegistry,
    load_in_flight: Arc<AtomicBool>,
    loaded: bool,
}

impl Executor {
    pub(super) fn new(
        engine: Box<dyn Engine>,
        hub: EventHub,
        interrupts: InterruptRegistry,
        load_in_flight: Arc<AtomicBool>,
    ) -> Self {
        Self { engine, hub, interrupts, load_in_flight, loaded: false }
    }

    pub(super) fn run(mut self, jobs: Receiver<Job>) {
        info!(engine = self.engine.name(), "executor started");
        while let Ok(job) = jobs.recv() {
            match job {
                Job::Check => self.check(),
                Job::Load => self.load(),
                Job::Generate { epoch, turns } => self.generate(epoch, &turns),
                Job::Reset => self.reset(),
            }
        }
        info!("executor stopped");
    }

    fn emit(&self, event: Event) {
        if self.hub.emit(event) == 0 {
            debug!("event dropped: no subscribers");
        }
    }

    fn check(&mut self) {
        match guarded(|| self.engine.check_acceleration(), EngineError::AccelerationUnavailable) {
            Ok(available) => {
                info!(available, "acceleration check finished");
                self.emit(Event::Checked { acceleration_available: available });
            }
            Err(e) => {
                warn!(error = %e, "acceleration check failed");
                self.emit(Event::Checked { acceleration_available: false });
                self.emit(Event::error(ErrorKind::CapabilityUnavailable, e.to_string()));
            }
        }
    }

    fn load(&mut self) {
        if self.loaded {
            debug!("load ignored: engine already loaded");
            self.load_in_flight.store(false, Ordering::Release);
            return;
        }

        info!(engine = self.engine.name(), "loading engine");
        self.emit(Event::Loading { message: DEFAULTS.messages.loading.clone() });

        let hub = self.hub.clone();
        let mut open: Vec<String> = Vec::new();
        let result = guarded(
            || self.engine.load(&mut |progress| relay_progress(&hub, &mut open, progress)),
            EngineError::Load,
        );

        // Rows the engine never closed would otherwise stay on screen forever
        for task_id in open.drain(..) {
            debug!(task_id = %task_id, "closing unfinished progress task");
            self.emit(Event::ProgressDone { task_id });
        }

        match result {
            Ok(()) => {
                self.loaded = true;
                info!("engine ready");
                self.emit(Event::Ready);
            }
            Err(e) => {
                error!(error = %e, "engine load failed");
                let kind = match e.kind() {
                    ErrorKind::CapabilityUnavailable => ErrorKind::CapabilityUnavailable,
                    _ => ErrorKind::LoadFailure,
                };
                self.emit(Event::error(kind, e.to_string()));
            }
        }
        self.load_in_flight.store(false, Ordering::Release);
    }

    fn generate(&mut self, epoch: u64, turns: &[ConversationTurn]) {
        if !self.loaded {
            warn!("generate rejected: engine not loaded");
            self.emit(Event::error(ErrorKind::ValidationFailure, EngineError::NotLoaded.to_string()));
            return;
        }
        if let Err(e) = validate_request(self.engine.task(), turns) {
            warn!(error = %e, "generate rejected");
            self.emit(Event::error(ErrorKind::ValidationFailure, e.to_string()));
            return;
        }

        let stop = self.interrupts.signal(epoch);
        debug!(epoch, turns = turns.len(), "generation started");
        self.emit(Event::GenerationStarted);

        let hub = self.hub.clone();
        let started = Instant::now();
        let mut produced = 0usize;
        let mut on_token = |chunk: &str, metrics: TokenMetrics| {
            if chunk.is_empty() {
                return;
            }
            produced += 1;
            let tokens_per_second = metrics.tokens_per_second.or_else(|| measured_rate(produced, started));
            hub.emit(Event::TokenProduced { text: chunk.to_string(), tokens_so_far: produced, tokens_per_second });
        };

        match guarded(|| self.engine.generate(turns, &mut on_token, &stop), EngineError::Generation) {
            Ok(output) => {
                info!(epoch, stop_reason = output.stop_reason.label(), "generation finished");
                self.emit(Event::GenerationComplete { final_text: output.final_text, stop_reason: output.stop_reason });
            }
            Err(e) => {
                error!(epoch, error = %e, "generation failed");
                self.emit(Event::error(ErrorKind::GenerationFailure, e.to_string()));
            }
        }
    }

    fn reset(&mut self) {
        // Earlier interrupt epochs can never match a future generation, so
        // there is nothing to clear here.
        info!(engine_ready = self.loaded, "session reset");
        self.emit(Event::ResetComplete { engine_ready: self.loaded });
    }
}

fn relay_progress(hub: &EventHub, open: &mut Vec<String>, progress: LoadProgress) {
    let event = match progress {
        LoadProgress::Status(message) => Event::Loading { message },
        LoadProgress::Init { task_id, total_bytes } => {
            if !open.contains(&task_id) {
                open.push(task_id.clone());
            }
            Event::ProgressInit { task_id, total_bytes }
        }
        LoadProgress::Update { task_id, loaded_bytes, total_bytes } => {
            if !open.contains(&task_id) {
                open.push(task_id.clone());
            }
            Event::ProgressUpdate { task_id, loaded_bytes, total_bytes }
        }
        LoadProgress::Done { task_id } => {
            open.retain(|id| id != &task_id);
            Event::ProgressDone { task_id }
        }
    };
    hub.emit(event);
}

fn measured_rate(produced: usize, started: Instant) -> Option<f64> {
    let secs = started.elapsed().as_secs_f64();
    (secs > 0.0).then(|| produced as f64 / secs)
}

/// Run an engine call, turning a panic into `on_panic(message)`
fn guarded<T>(
    call: impl FnOnce() -> Result<T, EngineError>,
    on_panic: fn(String) -> EngineError,
) -> Result<T, EngineError> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => {
            let message = format!("engine panicked: {}", panic_payload_message(payload));
            error!("{}", message);
            Err(on_panic(message))
        }
    }
}

fn panic_payload_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
