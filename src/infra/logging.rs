use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use crossterm::ExecutableCommand;
use crossterm::event::DisableBracketedPaste;
use crossterm::terminal::{LeaveAlternateScreen, disable_raw_mode};
use tracing_subscriber::EnvFilter;

use offload_base::config::constants::{DEFAULT_LOG_FILTER, ERRORS_DIR, LOG_ENV_VAR, LOG_FILE, PANIC_LOG_FILE};

/// Route `tracing` output to `<store>/offload.log`. The terminal belongs to the UI.
pub fn init_logging(store: &Path) -> io::Result<()> {
    fs::create_dir_all(store)?;
    let file = OpenOptions::new().create(true).append(true).open(store.join(LOG_FILE))?;
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(io::Error::other)
}

/// Write an error report to `<store>/errors/error_N.txt` and return its path
pub fn log_error(store: &Path, error: &str) -> PathBuf {
    let errors_dir = store.join(ERRORS_DIR);
    fs::create_dir_all(&errors_dir).ok();

    let existing = fs::read_dir(&errors_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "txt"))
                .count()
        })
        .unwrap_or(0);

    let number = existing + 1;
    let path = errors_dir.join(format!("error_{}.txt", number));
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    let content = format!(
        "Error Log #{}\n\
         Timestamp: {}\n\
         \n\
         Error Details:\n\
         {}\n",
        number, timestamp, error
    );
    if let Err(e) = fs::write(&path, content) {
        tracing::warn!(path = %path.display(), error = %e, "could not write error report");
    }
    path
}

/// Append every panic to `<store>/errors/panic.log`.
///
/// Worker threads catch engine panics and keep running, so only a panic on
/// the UI thread restores the terminal and reaches the default hook.
pub fn install_panic_hook(store: PathBuf) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let fatal = std::thread::current().name() == Some("main");
        if fatal {
            let _ = disable_raw_mode();
            let _ = io::stdout().execute(DisableBracketedPaste);
            let _ = io::stdout().execute(LeaveAlternateScreen);
        }

        let errors_dir = store.join(ERRORS_DIR);
        let _ = fs::create_dir_all(&errors_dir);
        let backtrace = std::backtrace::Backtrace::force_capture();
        let msg = format!("[{}] {}\n\n{}\n\n---\n", Local::now().to_rfc3339(), info, backtrace);
        let _ = OpenOptions::new()
            .create(true)
            .append(true)
            .open(errors_dir.join(PANIC_LOG_FILE))
            .and_then(|mut f| f.write_all(msg.as_bytes()));
        tracing::error!(panic = %info, fatal, "panic");

        if fatal {
            default_hook(info);
        }
    }));
}
