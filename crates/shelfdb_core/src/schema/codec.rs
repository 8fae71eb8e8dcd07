//! Schema descriptors as [`Value`] trees, for the journal.

use super::{DataType, IndexSchema, KeyPath, StoreSchema};
use crate::error::CoreResult;
use shelfdb_codec::{CodecError, Value};

fn field<'a>(value: &'a Value, name: &str) -> CoreResult<&'a Value> {
    value
        .get(name)
        .ok_or_else(|| CodecError::invalid_structure(format!("schema missing field '{name}'")).into())
}

fn text<'a>(value: &'a Value, name: &str) -> CoreResult<&'a str> {
    field(value, name)?
        .as_text()
        .ok_or_else(|| CodecError::invalid_structure(format!("schema field '{name}' must be text")).into())
}

fn flag(value: &Value, name: &str) -> CoreResult<bool> {
    field(value, name)?
        .as_bool()
        .ok_or_else(|| CodecError::invalid_structure(format!("schema field '{name}' must be a bool")).into())
}

fn key_path_to_value(path: Option<&KeyPath>) -> Value {
    match path {
        None => Value::Null,
        Some(KeyPath::Field(f)) => Value::from(f.as_str()),
        Some(KeyPath::Composite(fs)) => {
            Value::Array(fs.iter().map(|f| Value::from(f.as_str())).collect())
        }
    }
}

fn key_path_from_value(value: &Value) -> CoreResult<Option<KeyPath>> {
    match value {
        Value::Null => Ok(None),
        Value::Text(f) => Ok(Some(KeyPath::Field(f.clone()))),
        Value::Array(items) => items
            .iter()
            .map(|v| {
                v.as_text()
                    .map(str::to_string)
                    .ok_or_else(|| CodecError::invalid_structure("key path parts must be text").into())
            })
            .collect::<CoreResult<Vec<_>>>()
            .map(|parts| Some(KeyPath::Composite(parts))),
        other => Err(CodecError::invalid_structure(format!(
            "key path cannot be {}",
            other.type_name()
        ))
        .into()),
    }
}

fn data_type_to_value(t: Option<DataType>) -> Value {
    t.map_or(Value::Null, |t| Value::from(t.as_str()))
}

fn data_type_from_value(value: &Value) -> CoreResult<Option<DataType>> {
    match value {
        Value::Null => Ok(None),
        Value::Text(name) => DataType::parse(name)
            .map(Some)
            .ok_or_else(|| CodecError::invalid_structure(format!("unknown data type '{name}'")).into()),
        _ => Err(CodecError::invalid_structure("data type must be text").into()),
    }
}

/// Encodes an index. Generator closures are not persisted, only the flag.
#[must_use]
pub fn index_to_value(index: &IndexSchema) -> Value {
    Value::object([
        ("name", Value::from(index.name())),
        ("keyPath", key_path_to_value(Some(index.key_path()))),
        ("unique", Value::from(index.is_unique())),
        ("multiEntry", Value::from(index.is_multi_entry())),
        ("type", data_type_to_value(index.declared_type())),
        ("generator", Value::from(index.is_generator())),
    ])
}

/// Decodes an index written by [`index_to_value`].
///
/// # Errors
///
/// Returns a codec error for a malformed tree.
pub fn index_from_value(value: &Value) -> CoreResult<IndexSchema> {
    let key_path = key_path_from_value(field(value, "keyPath")?)?
        .ok_or_else(|| CodecError::invalid_structure("index key path must not be null"))?;
    let mut index = IndexSchema::new(text(value, "name")?, key_path)
        .unique(flag(value, "unique")?)
        .multi_entry(flag(value, "multiEntry")?);
    if let Some(t) = data_type_from_value(field(value, "type")?)? {
        index = index.data_type(t);
    }
    if flag(value, "generator")? {
        index = index.derived_marker();
    }
    Ok(index)
}

/// Encodes a store with its indexes.
#[must_use]
pub fn store_to_value(store: &StoreSchema) -> Value {
    Value::object([
        ("name", Value::from(store.name())),
        ("keyPath", key_path_to_value(store.key_path())),
        ("autoIncrement", Value::from(store.is_auto_increment())),
        ("keyType", data_type_to_value(store.declared_key_type())),
        (
            "indexes",
            Value::Array(store.indexes().iter().map(index_to_value).collect()),
        ),
    ])
}

/// Decodes a store written by [`store_to_value`].
///
/// # Errors
///
/// Returns a codec error for a malformed tree.
pub fn store_from_value(value: &Value) -> CoreResult<StoreSchema> {
    let name = text(value, "name")?;
    let mut store = match key_path_from_value(field(value, "keyPath")?)? {
        Some(path) => StoreSchema::with_key_path(name, path),
        None => StoreSchema::new(name),
    }
    .auto_increment(flag(value, "autoIncrement")?);
    if let Some(t) = data_type_from_value(field(value, "keyType")?)? {
        store = store.key_type(t);
    }
    let indexes = field(value, "indexes")?
        .as_array()
        .ok_or_else(|| CodecError::invalid_structure("indexes must be an array"))?
        .iter()
        .map(index_from_value)
        .collect::<CoreResult<Vec<_>>>()?;
    Ok(store.with_indexes(indexes))
}
