//! Deterministic engine for worker and controller tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use offload_base::conversation::ConversationTurn;
use offload_base::engine::{Engine, EngineError, GenerationOutput, LoadProgress, TaskKind, TokenMetrics};
use offload_base::interrupt::StopSignal;
use offload_base::protocol::StopReason;

const GATE_POLL: Duration = Duration::from_millis(5);

pub struct ScriptedEngine {
    pub task: TaskKind,
    pub acceleration: Result<bool, String>,
    pub load_steps: Vec<LoadProgress>,
    pub load_error: Option<String>,
    pub chunks: Vec<String>,
    pub final_text: Option<String>,
    pub generate_error: Option<String>,
    pub panic_on_generate: bool,
    pub tokens_per_second: Option<f64>,
    /// When set, each chunk waits for one `()` (or an interrupt)
    pub token_gate: Option<Receiver<()>>,
    pub loads: Arc<AtomicUsize>,
    pub requests: Arc<Mutex<Vec<Vec<ConversationTurn>>>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            task: TaskKind::Text,
            acceleration: Ok(true),
            load_steps: Vec::new(),
            load_error: None,
            chunks: Vec::new(),
            final_text: None,
            generate_error: None,
            panic_on_generate: false,
            tokens_per_second: None,
            token_gate: None,
            loads: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Streams `chunks` and reports `final_text` as the decoded result
    pub fn replying(chunks: &[&str], final_text: Option<&str>) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            final_text: final_text.map(str::to_string),
            ..Self::new()
        }
    }

    /// One weight file of `total` bytes delivered in two halves
    pub fn with_weights(mut self, task_id: &str, total: u64) -> Self {
        self.load_steps = vec![
            LoadProgress::Init { task_id: task_id.into(), total_bytes: Some(total) },
            LoadProgress::Update { task_id: task_id.into(), loaded_bytes: total / 2, total_bytes: Some(total) },
            LoadProgress::Update { task_id: task_id.into(), loaded_bytes: total, total_bytes: Some(total) },
            LoadProgress::Done { task_id: task_id.into() },
        ];
        self
    }

    pub fn gated(mut self) -> (Self, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        self.token_gate = Some(rx);
        (self, tx)
    }

    fn wait_for_gate(&self, stop: &StopSignal) {
        let Some(gate) = &self.token_gate else { return };
        while !stop.should_stop() {
            match gate.recv_timeout(GATE_POLL) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }
}

impl Engine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn task(&self) -> TaskKind {
        self.task
    }

    fn check_acceleration(&mut self) -> Result<bool, EngineError> {
        self.acceleration.clone().map_err(EngineError::AccelerationUnavailable)
    }

    fn load(&mut self, on_progress: &mut dyn FnMut(LoadProgress)) -> Result<(), EngineError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        for step in &self.load_steps {
            on_progress(step.clone());
        }
        match &self.load_error {
            Some(message) => Err(EngineError::Load(message.clone())),
            None => Ok(()),
        }
    }

    fn generate(
        &mut self,
        turns: &[ConversationTurn],
        on_token: &mut dyn FnMut(&str, TokenMetrics),
        stop: &StopSignal,
    ) -> Result<GenerationOutput, EngineError> {
        self.requests.lock().unwrap().push(turns.to_vec());
        if self.panic_on_generate {
            panic!("scripted engine panic");
        }
        if let Some(message) = &self.generate_error {
            return Err(EngineError::Generation(message.clone()));
        }

        let mut produced = String::new();
        for chunk in &self.chunks {
            self.wait_for_gate(stop);
            if stop.should_stop() {
                return Ok(GenerationOutput { final_text: Some(produced), stop_reason: StopReason::Interrupted });
            }
            on_token(chunk, TokenMetrics { tokens_per_second: self.tokens_per_second });
            produced.push_str(chunk);
        }
        Ok(GenerationOutput { final_text: self.final_text.clone(), stop_reason: StopReason::Finished })
    }
}
