pub mod config;
pub mod conversation;
pub mod engine;
pub mod format;
pub mod interrupt;
pub mod progress;
pub mod protocol;
pub mod state;
