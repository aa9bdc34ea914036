// Library surface for the game core, headless runs and integration tests.
// Terminal rendering stays in the binary.
pub mod app_dirs;
pub mod attempt;
pub mod config;
pub mod error;
pub mod events;
pub mod health;
pub mod history;
pub mod logging;
pub mod presets;
pub mod progress;
pub mod runtime;
pub mod session;
pub mod snake;
pub mod tally;
pub mod tune;
pub mod zone;
