//! Session worker: owns the engine off the UI thread.
//!
//! Two threads cooperate. The intake thread reads commands as they arrive,
//! raises interrupts immediately and forwards everything else in order to the
//! executor thread, which is the only place the engine is touched. This keeps
//! Interrupt responsive while a generation is blocking the executor.

mod executor;
pub mod hub;

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use offload_base::config::constants::{EXECUTOR_THREAD_NAME, INTAKE_THREAD_NAME};
use offload_base::engine::Engine;
use offload_base::interrupt::InterruptRegistry;
use offload_base::protocol::Command;

use executor::{Executor, Job};
pub use hub::EventHub;

pub struct SessionWorker {
    commands: Sender<Command>,
    intake: JoinHandle<()>,
    executor: JoinHandle<()>,
}

impl SessionWorker {
    /// Start both worker threads. Events go to every `hub` subscriber.
    pub fn spawn(engine: Box<dyn Engine>, hub: EventHub) -> io::Result<Self> {
        let (commands, command_rx) = mpsc::channel::<Command>();
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let interrupts = InterruptRegistry::new();
        let load_in_flight = Arc::new(AtomicBool::new(false));

        let executor = {
            let interrupts = interrupts.clone();
            let load_in_flight = load_in_flight.clone();
            thread::Builder::new()
                .name(EXECUTOR_THREAD_NAME.to_string())
                .spawn(move || Executor::new(engine, hub, interrupts, load_in_flight).run(job_rx))?
        };
        let intake = thread::Builder::new()
            .name(INTAKE_THREAD_NAME.to_string())
            .spawn(move || run_intake(command_rx, job_tx, interrupts, load_in_flight))?;

        Ok(Self { commands, intake, executor })
    }

    /// A sender for the controller. The worker keeps running while any exists.
    pub fn commands(&self) -> Sender<Command> {
        self.commands.clone()
    }

    /// Stop accepting commands and wait for both threads.
    ///
    /// Blocks until every sender handed out by `commands()` is dropped and the
    /// executor has finished its queue.
    pub fn shutdown(self) {
        drop(self.commands);
        for (name, handle) in [("intake", self.intake), ("executor", self.executor)] {
            if handle.join().is_err() {
                warn!(thread = name, "worker thread panicked");
            }
        }
    }
}

fn run_intake(
    commands: Receiver<Command>,
    jobs: Sender<Job>,
    interrupts: InterruptRegistry,
    load_in_flight: Arc<AtomicBool>,
) {
    while let Ok(command) = commands.recv() {
        debug!(command = command.name(), "command received");
        let job = match command {
            Command::Interrupt => {
                if interrupts.interrupt() {
                    info!("interrupt raised");
                } else {
                    debug!("interrupt ignored: no generation submitted");
                }
                continue;
            }
            Command::Load => {
                if load_in_flight.swap(true, Ordering::AcqRel) {
                    debug!("load ignored: already in flight");
                    continue;
                }
                Job::Load
            }
            Command::Check => Job::Check,
            Command::Generate(turns) => Job::Generate { epoch: interrupts.submit(), turns },
            Command::Reset => Job::Reset,
        };
        if jobs.send(job).is_err() {
            warn!("executor gone, intake stopping");
            break;
        }
    }
    debug!("intake stopped");
}
