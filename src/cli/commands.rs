//! CLI command implementations
//!
//! Commands only use the public store API; they write their output to the
//! given writer so they can be exercised without a terminal.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::StoreConfig;
use crate::mvcc::Store;
use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::schema::{SchemaDefinition, ID_INDEX};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Fixture file: a schema definition plus records per table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub schema: SchemaDefinition,
    #[serde(default)]
    pub records: BTreeMap<String, Vec<Value>>,
}

impl Fixture {
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::fixture_error(format!("failed to read fixture {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Opens a store and loads every record in one write transaction.
    pub fn into_store(self, config: StoreConfig) -> CliResult<Store<Value>> {
        let store = Store::open_with_config(self.schema.build()?, config)?;
        let mut txn = store.write_txn()?;
        for (table, records) in self.records {
            for record in records {
                txn.insert(&table, record)?;
            }
        }
        txn.commit()?;
        Ok(store)
    }
}

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    if !cli.verbose {
        Logger::set_min_severity(Severity::Warn);
    }
    run_command(cli.command)
}

/// Run the appropriate command, writing to stdout
pub fn run_command(cmd: Command) -> CliResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cmd {
        Command::Validate { schema } => validate(&schema, &mut out),
        Command::Inspect {
            fixture,
            table,
            dot,
            config,
        } => inspect(&fixture, table.as_deref(), dot, config.as_deref(), &mut out),
    }
}

/// Validates a schema definition and prints its table names.
pub fn validate(schema_path: &Path, out: &mut dyn Write) -> CliResult<()> {
    let path = schema_path.display().to_string();
    let schema = match SchemaDefinition::from_file(schema_path).and_then(|def| def.build()) {
        Ok(schema) => schema,
        Err(e) => {
            let code = e.code().code();
            log_event_with_fields(Event::SchemaRejected, &[("code", code), ("path", path.as_str())]);
            return Err(e.into());
        }
    };

    let tables = schema.table_names();
    let count = tables.len().to_string();
    log_event_with_fields(
        Event::SchemaValidated,
        &[("path", path.as_str()), ("tables", count.as_str())],
    );

    for table in tables {
        writeln!(out, "{}", table)?;
    }
    Ok(())
}

/// Loads a fixture and dumps a table, or lists tables.
pub fn inspect(
    fixture_path: &Path,
    table: Option<&str>,
    dot: bool,
    config_path: Option<&Path>,
    out: &mut dyn Write,
) -> CliResult<()> {
    let config = match config_path {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    let store = Fixture::load(fixture_path)?.into_store(config)?;

    let table = match table {
        Some(name) if store.schema().table(name).is_some() => name,
        _ => {
            for name in store.schema().table_names() {
                writeln!(out, "{}", name)?;
            }
            return Ok(());
        }
    };

    let txn = store.read_txn();
    writeln!(out, "=== DATA FOR TABLE {} ===", table)?;
    for (i, record) in txn.get(table, ID_INDEX, &[])?.enumerate() {
        if i > 0 {
            writeln!(out, "===")?;
        }
        writeln!(out, "{}", serde_json::to_string_pretty(record.as_ref())?)?;
    }

    if dot {
        if let Some(schema) = store.schema().table(table) {
            for index in schema.indexes() {
                writeln!(out, "=== GRAPH FOR INDEX {}.{} ===", table, index.name())?;
                write!(out, "{}", txn.export(table, index.name())?)?;
            }
        }
    }
    Ok(())
}
