//! CLI module for memdb
//!
//! Provides command-line interface for:
//! - validate: check a JSON schema definition
//! - inspect: load a fixture and dump tables or index trees

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{inspect, run, run_command, validate, Fixture};
pub use errors::{CliError, CliErrorCode, CliResult};
