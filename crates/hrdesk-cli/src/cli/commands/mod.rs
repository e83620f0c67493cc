//! CLI command handlers, one per file.

mod classify;
mod config;
mod fetch;
mod simulate;
mod statuses;

pub use classify::run_classify;
pub use config::run_config;
pub use fetch::run_fetch;
pub use simulate::run_simulate;
pub use statuses::run_statuses;
