//! Dump command implementation.

use super::{connect_live, open_existing, CliResult};
use serde_json::{Map, Number};
use shelfdb_codec::Value;
use shelfdb_core::{CursorPosition, ListItem, ListMethod, ListQuery};
use std::path::Path;

const PAGE: usize = 256;

/// Converts a record into JSON. Bytes become lowercase hex strings and
/// non-finite floats become null.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Integer(n) => serde_json::Value::Number((*n).into()),
        Value::Float(x) => Number::from_f64(*x).map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::Bytes(bytes) => serde_json::Value::String(bytes.iter().map(|b| format!("{b:02x}")).collect()),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Map(fields) => {
            let mut map = Map::new();
            for (name, field) in fields {
                map.insert(name.clone(), to_json(field));
            }
            serde_json::Value::Object(map)
        }
    }
}

/// Runs the dump command.
pub fn run(dir: &Path, name: &str, store: &str, limit: Option<usize>) -> CliResult<()> {
    let pool = open_existing(dir, name)?;
    let conn = connect_live(&pool, name)?;
    let mut remaining = limit.unwrap_or(usize::MAX);
    let mut position = CursorPosition::new();

    while remaining > 0 && !position.is_exhausted() {
        let query = ListQuery::new(store, ListMethod::Entries).limit(remaining.min(PAGE));
        let page = conn.list_from(&query, &mut position)?;
        if page.is_empty() {
            break;
        }
        for item in &page {
            if let ListItem::Entry { primary_key, value, .. } = item {
                let line = serde_json::json!({
                    "key": to_json(&primary_key.to_value()),
                    "value": to_json(value),
                });
                println!("{line}");
            }
        }
        remaining -= page.len();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_convert_to_json() {
        let record = Value::object([
            ("id", Value::from(7)),
            ("blob", Value::Bytes(vec![0x0a, 0xff])),
            ("ratio", Value::Float(f64::INFINITY)),
            ("tags", Value::Array(vec![Value::from("a"), Value::Null])),
        ]);
        assert_eq!(
            to_json(&record),
            serde_json::json!({"id": 7, "blob": "0aff", "ratio": null, "tags": ["a", null]})
        );
    }
}
