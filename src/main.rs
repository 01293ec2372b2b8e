mod app;
mod controller;
mod engines;
mod infra;
mod ui;
mod worker;

use std::io;
use std::path::Path;
use std::time::Duration;

use crossterm::{
    ExecutableCommand,
    event::{DisableBracketedPaste, EnableBracketedPaste},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tracing::{debug, info, warn};

use offload_base::config::EngineKind;
use offload_base::config::constants::STORE_DIR;

use app::{App, AppState};
use controller::Controller;
use engines::get_engine;
use infra::config::RuntimeConfig;
use infra::logging::{init_logging, install_panic_hook};
use worker::{EventHub, SessionWorker};

fn main() -> io::Result<()> {
    let root = Path::new(".");
    let store = root.join(STORE_DIR);

    let mut config = RuntimeConfig::load(root).map_err(io::Error::other)?;

    // `--engine <name>` beats file and environment
    let args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args.iter().position(|a| a == "--engine") {
        let name = args.get(pos + 1).map(String::as_str).unwrap_or_default();
        config.engine.kind = EngineKind::parse(name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("unknown engine '{}'", name)))?;
    }

    if let Err(e) = init_logging(&store) {
        eprintln!("logging disabled: {}", e);
    }
    install_panic_hook(store.clone());
    info!(engine = config.engine.kind.display_name(), "starting");

    let hub = EventHub::new();
    let events = hub.subscribe();
    debug!(subscribers = hub.subscriber_count(), "event hub ready");
    let worker = SessionWorker::spawn(get_engine(&config.engine), hub)?;

    let timeout = config.generation_timeout_ms.map(Duration::from_millis);
    let mut controller = Controller::new(worker.commands(), timeout);
    if let Err(e) = controller.check() {
        warn!(error = %e, "capability check could not be sent");
    }

    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    io::stdout().execute(EnableBracketedPaste)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    let state = AppState::new(controller, config.engine.kind.display_name());
    let mut app = App::new(state, events, store);
    let result = app.run(&mut terminal);

    // Cleanup
    disable_raw_mode()?;
    io::stdout().execute(DisableBracketedPaste)?;
    io::stdout().execute(LeaveAlternateScreen)?;

    // Dropping the app closes the command channel so the worker can exit
    if app.state.controller.phase.is_active() {
        let _ = app.state.controller.interrupt();
    }
    drop(app);
    worker.shutdown();
    info!("stopped");
    result
}
