//! Delimited text bulk load.

use crate::engine::WriteMode;
use crate::error::{CoreError, CoreResult};
use crate::schema::{DataType, KeyPath, StoreSchema};
use crate::transaction::Transaction;
use shelfdb_codec::{Key, Value};
use tracing::debug;

/// Declared type of each header field: the type of the index named after
/// it, else the key type when the field is the key path.
fn field_types(schema: &StoreSchema, fields: &[&str]) -> Vec<Option<DataType>> {
    fields
        .iter()
        .map(|field| match schema.get_index(field) {
            Some(index) => index.declared_type(),
            None => match schema.key_path() {
                Some(KeyPath::Field(path)) if path == field => schema.declared_key_type(),
                _ => None,
            },
        })
        .collect()
}

fn strip_quotes(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

fn coerce(store: &str, field: &str, raw: &str, data_type: Option<DataType>) -> CoreResult<Value> {
    let bad = |what: &str| CoreError::data(store, format!("field '{field}': '{raw}' is not {what}"));
    match data_type {
        None => Ok(Value::from(raw)),
        Some(DataType::Text) => Ok(Value::from(strip_quotes(raw))),
        Some(DataType::Integer) => raw
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| bad("an integer")),
        Some(DataType::Numeric) => match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Value::Float(n)),
            _ => Err(bad("a number")),
        },
    }
}

/// Loads one record per line after the header line, in order.
///
/// Loading stops at the first failing line; the keys of the records
/// written before it stay in the transaction.
pub(crate) fn put_data(tx: &mut Transaction<'_>, store: &str, data: &str, delimiter: char) -> CoreResult<Vec<Key>> {
    let schema = tx.store(store)?.schema().clone();
    let mut lines = data.lines();
    let header = lines
        .next()
        .ok_or_else(|| CoreError::argument("delimited data needs a header line"))?;
    let fields: Vec<&str> = header.split(delimiter).map(str::trim).collect();
    if fields.iter().any(|f| f.is_empty()) {
        return Err(CoreError::argument("header has an empty field name"));
    }
    let types = field_types(&schema, &fields);
    debug!(store, fields = fields.len(), "loading delimited data");

    let mut keys = Vec::new();
    for line in lines.filter(|l| !l.trim().is_empty()) {
        let mut record = Value::Map(Vec::new());
        for ((field, data_type), raw) in fields.iter().zip(&types).zip(line.split(delimiter)) {
            record.set(field, coerce(store, field, raw, *data_type)?);
        }
        keys.push(tx.put(store, record, None, WriteMode::Put)?);
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IndexSchema;

    #[test]
    fn types_come_from_indexes_and_key_path() {
        let schema = StoreSchema::with_key_path("items", "id")
            .key_type(DataType::Integer)
            .index(IndexSchema::new("price", "price").data_type(DataType::Numeric))
            .index(IndexSchema::new("name", "name").data_type(DataType::Text));
        let types = field_types(&schema, &["id", "name", "price", "note"]);
        assert_eq!(
            types,
            vec![
                Some(DataType::Integer),
                Some(DataType::Text),
                Some(DataType::Numeric),
                None
            ]
        );
    }

    #[test]
    fn coercion() {
        assert_eq!(coerce("s", "f", "\"cat\"", Some(DataType::Text)).unwrap(), Value::from("cat"));
        assert_eq!(coerce("s", "f", "\"cat\"", None).unwrap(), Value::from("\"cat\""));
        assert_eq!(coerce("s", "f", " 42", Some(DataType::Integer)).unwrap(), Value::Integer(42));
        assert_eq!(coerce("s", "f", "2.5", Some(DataType::Numeric)).unwrap(), Value::Float(2.5));
        assert!(matches!(
            coerce("s", "f", "x", Some(DataType::Integer)),
            Err(CoreError::Data { .. })
        ));
    }
}
