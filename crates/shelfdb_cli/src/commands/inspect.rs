//! Inspect command implementation.

use super::{connect_live, open_existing, CliResult};
use serde::Serialize;
use shelfdb_core::{Connection, StoreSchema};
use std::path::Path;

/// Database inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Database name.
    pub name: String,
    /// Schema version.
    pub version: u32,
    /// Journal size in bytes.
    pub journal_size: u64,
    /// Journal frames.
    pub frames: usize,
    /// Per-store details.
    pub stores: Vec<StoreInfo>,
}

/// Details of one store.
#[derive(Debug, Serialize)]
pub struct StoreInfo {
    /// Store name.
    pub name: String,
    /// In-line key path, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_path: Option<String>,
    /// Whether keys are generated.
    pub auto_increment: bool,
    /// Number of records.
    pub records: usize,
    /// Indexes of the store.
    pub indexes: Vec<IndexInfo>,
}

/// Details of one index.
#[derive(Debug, Serialize)]
pub struct IndexInfo {
    /// Index name.
    pub name: String,
    /// Indexed key path.
    pub key_path: String,
    /// Unique constraint.
    pub unique: bool,
    /// One entry per array element.
    pub multi_entry: bool,
    /// Values are derived by a generator.
    pub generated: bool,
}

fn store_info(conn: &Connection, schema: &StoreSchema) -> CliResult<StoreInfo> {
    Ok(StoreInfo {
        name: schema.name().to_string(),
        key_path: schema.key_path().map(ToString::to_string),
        auto_increment: schema.is_auto_increment(),
        records: conn.count(schema.name())?,
        indexes: schema
            .indexes()
            .iter()
            .map(|index| IndexInfo {
                name: index.name().to_string(),
                key_path: index.key_path().to_string(),
                unique: index.is_unique(),
                multi_entry: index.is_multi_entry(),
                generated: index.is_generator(),
            })
            .collect(),
    })
}

/// Runs the inspect command.
pub fn run(dir: &Path, name: &str, format: &str) -> CliResult<()> {
    let pool = open_existing(dir, name)?;
    let scan = pool.verify(name)?;
    let conn = connect_live(&pool, name)?;
    let schema = conn.schema();

    let result = InspectResult {
        name: name.to_string(),
        version: conn.version(),
        journal_size: scan.valid_len,
        frames: scan.records.len(),
        stores: schema
            .stores()
            .iter()
            .map(|store| store_info(&conn, store))
            .collect::<CliResult<_>>()?,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Database: {}", result.name);
    println!("Version:  {}", result.version);
    println!("Journal:  {} bytes in {} frames", result.journal_size, result.frames);
    println!();
    if result.stores.is_empty() {
        println!("No stores");
        return;
    }
    for store in &result.stores {
        let key = match (&store.key_path, store.auto_increment) {
            (Some(path), true) => format!("key path '{path}', auto increment"),
            (Some(path), false) => format!("key path '{path}'"),
            (None, true) => "auto increment".to_string(),
            (None, false) => "out-of-line keys".to_string(),
        };
        println!("{} ({key}): {} records", store.name, store.records);
        for index in &store.indexes {
            let mut flags = Vec::new();
            if index.unique {
                flags.push("unique");
            }
            if index.multi_entry {
                flags.push("multi-entry");
            }
            if index.generated {
                flags.push("generated");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };
            println!("  index {} on '{}'{flags}", index.name, index.key_path);
        }
    }
}
