//! Command implementations for the CLI.

mod config;
mod monitor;
mod read;
mod scan;
mod set;
mod watch;

pub use config::cmd_config;
pub use monitor::{MonitorArgs, cmd_monitor};
pub use read::{ReadArgs, cmd_read};
pub use scan::cmd_scan;
pub use set::cmd_set;
pub use watch::{WatchArgs, cmd_watch};
