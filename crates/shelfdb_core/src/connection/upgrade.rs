//! Structural changes applied by a version upgrade.

use crate::engine::{DatabaseState, ObjectStore};
use crate::error::{CoreError, CoreResult};
use crate::journal::text_field;
use crate::schema::{index_from_value, index_to_value, store_from_value, store_to_value};
use crate::schema::{DatabaseSchema, IndexSchema, StoreSchema};
use shelfdb_codec::{CodecError, Value};
use std::fmt;

/// One structural step of an upgrade, in the order it is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaChange {
    /// Create an empty store.
    CreateStore(StoreSchema),
    /// Drop a store and its records.
    DeleteStore {
        /// Store name.
        store: String,
    },
    /// Drop a store and create it again with new key rules. Records are lost.
    RecreateStore(StoreSchema),
    /// Remove every record of a store, keeping its structure.
    ClearStore {
        /// Store name.
        store: String,
    },
    /// Add an index and build it from existing records.
    CreateIndex {
        /// Store name.
        store: String,
        /// Index definition.
        index: IndexSchema,
    },
    /// Drop an index.
    DeleteIndex {
        /// Store name.
        store: String,
        /// Index name.
        index: String,
    },
    /// Drop an index and build its new definition.
    RecreateIndex {
        /// Store name.
        store: String,
        /// New index definition.
        index: IndexSchema,
    },
}

impl SchemaChange {
    /// The store this change touches.
    #[must_use]
    pub fn store(&self) -> &str {
        match self {
            Self::CreateStore(s) | Self::RecreateStore(s) => s.name(),
            Self::DeleteStore { store }
            | Self::ClearStore { store }
            | Self::CreateIndex { store, .. }
            | Self::DeleteIndex { store, .. }
            | Self::RecreateIndex { store, .. } => store,
        }
    }

    /// True when applying the change loses records.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Self::DeleteStore { .. } | Self::RecreateStore(_) | Self::ClearStore { .. }
        )
    }

    pub(crate) fn to_value(&self) -> Value {
        let (kind, mut fields) = match self {
            Self::CreateStore(s) => ("create_store", vec![("schema", store_to_value(s))]),
            Self::RecreateStore(s) => ("recreate_store", vec![("schema", store_to_value(s))]),
            Self::DeleteStore { store } => ("delete_store", vec![("store", Value::from(store.as_str()))]),
            Self::ClearStore { store } => ("clear_store", vec![("store", Value::from(store.as_str()))]),
            Self::CreateIndex { store, index } => (
                "create_index",
                vec![("store", Value::from(store.as_str())), ("index", index_to_value(index))],
            ),
            Self::RecreateIndex { store, index } => (
                "recreate_index",
                vec![("store", Value::from(store.as_str())), ("index", index_to_value(index))],
            ),
            Self::DeleteIndex { store, index } => (
                "delete_index",
                vec![
                    ("store", Value::from(store.as_str())),
                    ("index", Value::from(index.as_str())),
                ],
            ),
        };
        fields.push(("kind", Value::from(kind)));
        Value::object(fields)
    }

    pub(crate) fn from_value(value: &Value) -> CoreResult<Self> {
        let schema = || -> CoreResult<StoreSchema> {
            store_from_value(
                value
                    .get("schema")
                    .ok_or_else(|| CodecError::invalid_structure("schema change missing 'schema'"))?,
            )
        };
        let index = || -> CoreResult<IndexSchema> {
            index_from_value(
                value
                    .get("index")
                    .ok_or_else(|| CodecError::invalid_structure("schema change missing 'index'"))?,
            )
        };
        let store = || -> CoreResult<String> { Ok(text_field(value, "store")?.to_string()) };

        match text_field(value, "kind")? {
            "create_store" => Ok(Self::CreateStore(schema()?)),
            "recreate_store" => Ok(Self::RecreateStore(schema()?)),
            "delete_store" => Ok(Self::DeleteStore { store: store()? }),
            "clear_store" => Ok(Self::ClearStore { store: store()? }),
            "create_index" => Ok(Self::CreateIndex {
                store: store()?,
                index: index()?,
            }),
            "recreate_index" => Ok(Self::RecreateIndex {
                store: store()?,
                index: index()?,
            }),
            "delete_index" => Ok(Self::DeleteIndex {
                store: store()?,
                index: text_field(value, "index")?.to_string(),
            }),
            other => Err(CodecError::invalid_structure(format!("unknown schema change '{other}'")).into()),
        }
    }
}

impl fmt::Display for SchemaChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateStore(s) => write!(f, "create store '{}'", s.name()),
            Self::DeleteStore { store } => write!(f, "delete store '{store}'"),
            Self::RecreateStore(s) => write!(f, "recreate store '{}'", s.name()),
            Self::ClearStore { store } => write!(f, "clear store '{store}'"),
            Self::CreateIndex { store, index } => write!(f, "create index '{store}.{}'", index.name()),
            Self::DeleteIndex { store, index } => write!(f, "delete index '{store}.{index}'"),
            Self::RecreateIndex { store, index } => {
                write!(f, "recreate index '{store}.{}'", index.name())
            }
        }
    }
}

/// Lists the changes that turn `live` into `declared`.
///
/// Stores whose key rules differ are recreated whole. A generator index
/// that is missing or changed clears its store first, since derived values
/// only appear on records written after the index exists.
pub(crate) fn plan_changes(declared: &DatabaseSchema, live: &DatabaseSchema) -> Vec<SchemaChange> {
    let mut changes = Vec::new();
    for store in declared.stores() {
        let name = store.name().to_string();
        let Some(existing) = live.get_store(store.name()) else {
            changes.push(SchemaChange::CreateStore(store.clone()));
            continue;
        };
        if !store.same_key_rules(existing) {
            changes.push(SchemaChange::RecreateStore(store.clone()));
            continue;
        }

        let regenerates = store.indexes().iter().any(|index| {
            index.is_generator() && existing.get_index(index.name()).map_or(true, |e| e != index)
        });
        if regenerates {
            changes.push(SchemaChange::ClearStore { store: name.clone() });
        }

        for index in store.indexes() {
            match existing.get_index(index.name()) {
                None => changes.push(SchemaChange::CreateIndex {
                    store: name.clone(),
                    index: index.clone(),
                }),
                Some(e) if e != index => changes.push(SchemaChange::RecreateIndex {
                    store: name.clone(),
                    index: index.clone(),
                }),
                Some(_) => {}
            }
        }
        for index in existing.indexes() {
            if store.get_index(index.name()).is_none() {
                changes.push(SchemaChange::DeleteIndex {
                    store: name.clone(),
                    index: index.name().to_string(),
                });
            }
        }
    }
    for existing in live.stores() {
        if declared.get_store(existing.name()).is_none() {
            changes.push(SchemaChange::DeleteStore {
                store: existing.name().to_string(),
            });
        }
    }
    changes
}

/// Applies one change to `state`. Used both by upgrades and by journal
/// replay.
pub(crate) fn apply_change(state: &mut DatabaseState, change: &SchemaChange) -> CoreResult<()> {
    let existing = |state: &mut DatabaseState, name: &str| -> CoreResult<()> {
        if state.has_store(name) {
            Ok(())
        } else {
            Err(CoreError::invalid_operation(format!("upgrade refers to missing store '{name}'")))
        }
    };
    match change {
        SchemaChange::CreateStore(schema) => {
            if state.has_store(schema.name()) {
                return Err(CoreError::invalid_operation(format!(
                    "store '{}' already exists",
                    schema.name()
                )));
            }
            state.insert_store(ObjectStore::new(schema.clone()));
        }
        SchemaChange::RecreateStore(schema) => {
            existing(state, schema.name())?;
            state.remove_store(schema.name());
            state.insert_store(ObjectStore::new(schema.clone()));
        }
        SchemaChange::DeleteStore { store } => {
            existing(state, store)?;
            state.remove_store(store);
        }
        SchemaChange::ClearStore { store } => {
            existing(state, store)?;
            if let Some(s) = state.store_mut(store) {
                s.clear();
            }
        }
        SchemaChange::CreateIndex { store, index } | SchemaChange::RecreateIndex { store, index } => {
            existing(state, store)?;
            if let Some(s) = state.store_mut(store) {
                s.delete_index(index.name());
                s.create_index(index.clone())?;
            }
        }
        SchemaChange::DeleteIndex { store, index } => {
            existing(state, store)?;
            if let Some(s) = state.store_mut(store) {
                s.delete_index(index);
            }
        }
    }
    Ok(())
}
