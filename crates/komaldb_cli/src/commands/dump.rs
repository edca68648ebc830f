//! Dump command implementation.

use crate::commands::interpreter::render_entries;
use komaldb_core::{Config, Database, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Dump output.
#[derive(Debug, Serialize)]
pub struct DumpResult {
    /// Database path.
    pub path: String,
    /// Number of keys.
    pub key_count: usize,
    /// Every entry, by key.
    pub entries: BTreeMap<String, Value>,
}

/// Runs the dump command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Err(format!("No database found at {}", path.display()).into());
    }

    let config = Config::default().create_if_missing(false).audit(false);
    let db = Database::open_with_config(path, config)?;
    let entries = db.entries();

    match format {
        "json" => {
            let result = DumpResult {
                path: path.display().to_string(),
                key_count: entries.len(),
                entries: entries.into_iter().collect(),
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            println!("Database: {}", path.display());
            println!("Keys: {}", entries.len());
            println!();
            println!("{}", render_entries(&entries));
        }
    }

    Ok(())
}
