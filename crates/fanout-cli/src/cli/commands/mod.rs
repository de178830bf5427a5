//! CLI command handlers. Each command is in its own file.

mod backoff;
mod config;
mod probe;

pub use backoff::run_backoff;
pub use config::run_config;
pub use probe::{run_probe, ProbeArgs};
