//! CLI module
//!
//! Command-line interface for the sync engine.
//!
//! # Commands
//!
//! - `sync` - Run one sync pass
//! - `watch` - Run passes on an interval
//! - `status` - Show checkpoint and mirror size
//! - `get` - Print one mirrored payload
//! - `reset` - Clear checkpoint and mirror
//! - `validate` - Validate the config file

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
