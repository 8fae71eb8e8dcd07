//! Load command implementation.

use super::{connect_live, open_existing, CliResult};
use std::fs;
use std::path::Path;
use tracing::info;

/// Runs the load command.
pub fn run(dir: &Path, name: &str, store: &str, file: &Path, delimiter: char) -> CliResult<()> {
    let data = fs::read_to_string(file).map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let pool = open_existing(dir, name)?;
    let conn = connect_live(&pool, name)?;
    if !conn.store_names().iter().any(|s| s == store) {
        return Err(format!("No store '{store}' in database '{name}'").into());
    }

    let keys = conn.load(store, &data, delimiter)?;
    info!(database = name, store, records = keys.len(), "loaded");
    println!("Loaded {} records into {name}.{store}", keys.len());
    Ok(())
}
