//! CLI command implementations

mod check_config;
mod classify;
pub mod context;
pub mod style;
mod watch;

pub use check_config::run_check_config;
pub use classify::run_classify;
pub use watch::{WatchOptions, run_watch};
