//! CLI argument definitions using clap
//!
//! Commands:
//! - memdb validate --schema <path>
//! - memdb inspect --fixture <path> [--table <name>] [--dot] [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// memdb - inspect schema-driven in-memory table stores
#[derive(Parser, Debug)]
#[command(name = "memdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Emit INFO log lines on stdout
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a JSON schema definition and list its tables
    Validate {
        /// Path to the schema definition
        #[arg(long)]
        schema: PathBuf,
    },

    /// Load a fixture into a store and dump its contents
    Inspect {
        /// Path to the fixture: {"schema": ..., "records": {table: [...]}}
        #[arg(long)]
        fixture: PathBuf,

        /// Table to dump; lists tables when absent or unknown
        #[arg(long)]
        table: Option<String>,

        /// Also print the Graphviz export of the table's index trees
        #[arg(long)]
        dot: bool,

        /// Optional store configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
