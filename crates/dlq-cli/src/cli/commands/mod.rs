//! CLI command handlers. Each command is in its own file.

mod config;
mod run;
mod send;

pub use config::run_config;
pub use run::{run_queue, RunOptions};
pub use send::run_send;
