// =============================================================================
// STORAGE
// =============================================================================

/// Directory for logs, error reports and the runtime config override
pub const STORE_DIR: &str = ".offload";

/// Runtime config override (inside STORE_DIR)
pub const CONFIG_FILE: &str = "config.json";

/// Error reports directory (inside STORE_DIR)
pub const ERRORS_DIR: &str = "errors";

/// Tracing output (inside STORE_DIR)
pub const LOG_FILE: &str = "offload.log";

/// Panic reports (inside STORE_DIR/ERRORS_DIR)
pub const PANIC_LOG_FILE: &str = "panic.log";

// =============================================================================
// LOGGING
// =============================================================================

/// Env var holding a tracing filter directive
pub const LOG_ENV_VAR: &str = "OFFLOAD_LOG";

/// Filter used when LOG_ENV_VAR is unset or invalid
pub const DEFAULT_LOG_FILTER: &str = "offload=info,offload_base=info";

// =============================================================================
// WORKER
// =============================================================================

/// Thread that receives commands and raises interrupts
pub const INTAKE_THREAD_NAME: &str = "offload-intake";

/// Thread that owns the engine and runs commands in order
pub const EXECUTOR_THREAD_NAME: &str = "offload-executor";

// =============================================================================
// EVENT LOOP
// =============================================================================

/// Poll interval while a load or generation is active
pub const EVENT_POLL_MS: u64 = 8;

/// Poll interval when idle
pub const IDLE_POLL_MS: u64 = 50;

/// Minimum time between two redraws
pub const RENDER_THROTTLE_MS: u64 = 36;

/// Spinner frame duration
pub const SPINNER_FRAME_MS: u64 = 80;

// =============================================================================
// SCROLLING
// =============================================================================

/// Scroll amount for arrow keys
pub const SCROLL_ARROW_AMOUNT: u16 = 3;

/// Scroll amount for PageUp/PageDown
pub const SCROLL_PAGE_AMOUNT: u16 = 10;

