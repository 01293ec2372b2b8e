pub mod actions;
mod app;
pub mod events;
pub mod input;
pub mod state;

pub use app::App;
pub use state::AppState;
