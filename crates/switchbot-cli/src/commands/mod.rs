//! Command implementations for the CLI.

mod action;
mod alias;
mod info;
mod scan;
mod timers;

pub use action::cmd_action;
pub use alias::{AliasAction, cmd_alias};
pub use info::cmd_info;
pub use scan::cmd_scan;
pub use timers::cmd_timers;
