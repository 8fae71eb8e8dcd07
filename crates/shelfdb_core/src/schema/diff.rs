//! Structural comparison of a declared schema against a live one.

use super::{DatabaseSchema, KeyPath, StoreSchema};
use std::fmt;

/// One way a declared schema differs from the live database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaDifference {
    /// Declared store absent from the live database.
    MissingStore {
        /// Store name.
        store: String,
    },
    /// Live store that is not declared.
    ExtraStore {
        /// Store name.
        store: String,
    },
    /// The primary key path differs.
    KeyPathChanged {
        /// Store name.
        store: String,
        /// Declared key path.
        declared: Option<KeyPath>,
        /// Live key path.
        live: Option<KeyPath>,
    },
    /// The auto-increment flag differs.
    AutoIncrementChanged {
        /// Store name.
        store: String,
        /// Declared flag.
        declared: bool,
    },
    /// The declared primary key type differs.
    KeyTypeChanged {
        /// Store name.
        store: String,
    },
    /// Declared index absent from the live store.
    MissingIndex {
        /// Store name.
        store: String,
        /// Index name.
        index: String,
        /// Whether it is a generator index.
        generator: bool,
    },
    /// Live index that is not declared.
    ExtraIndex {
        /// Store name.
        store: String,
        /// Index name.
        index: String,
    },
    /// Index exists on both sides with a different definition.
    IndexChanged {
        /// Store name.
        store: String,
        /// Index name.
        index: String,
    },
}

impl SchemaDifference {
    /// The store this difference concerns.
    #[must_use]
    pub fn store(&self) -> &str {
        match self {
            Self::MissingStore { store }
            | Self::ExtraStore { store }
            | Self::KeyPathChanged { store, .. }
            | Self::AutoIncrementChanged { store, .. }
            | Self::KeyTypeChanged { store }
            | Self::MissingIndex { store, .. }
            | Self::ExtraIndex { store, .. }
            | Self::IndexChanged { store, .. } => store,
        }
    }

    /// True when reconciling it means recreating the whole store.
    #[must_use]
    pub fn requires_store_recreation(&self) -> bool {
        matches!(
            self,
            Self::KeyPathChanged { .. } | Self::AutoIncrementChanged { .. } | Self::KeyTypeChanged { .. }
        )
    }
}

fn opt_path(path: Option<&KeyPath>) -> String {
    path.map_or_else(|| "(none)".to_string(), ToString::to_string)
}

impl fmt::Display for SchemaDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStore { store } => write!(f, "store '{store}' missing"),
            Self::ExtraStore { store } => write!(f, "store '{store}' not declared"),
            Self::KeyPathChanged {
                store,
                declared,
                live,
            } => write!(
                f,
                "store '{store}' key path {} differs from live {}",
                opt_path(declared.as_ref()),
                opt_path(live.as_ref())
            ),
            Self::AutoIncrementChanged { store, declared } => {
                write!(f, "store '{store}' auto-increment should be {declared}")
            }
            Self::KeyTypeChanged { store } => write!(f, "store '{store}' key type differs"),
            Self::MissingIndex {
                store,
                index,
                generator,
            } => {
                let kind = if *generator { "generator index" } else { "index" };
                write!(f, "{kind} '{store}.{index}' missing")
            }
            Self::ExtraIndex { store, index } => write!(f, "index '{store}.{index}' not declared"),
            Self::IndexChanged { store, index } => write!(f, "index '{store}.{index}' changed"),
        }
    }
}

impl DatabaseSchema {
    /// Lists every structural difference between this declared schema and
    /// `live`, in declaration order followed by undeclared live stores.
    ///
    /// Versions are not compared. An empty result means no migration is
    /// needed.
    #[must_use]
    pub fn diff(&self, live: &DatabaseSchema) -> Vec<SchemaDifference> {
        let mut out = Vec::new();
        for declared in self.stores() {
            match live.get_store(declared.name()) {
                None => out.push(SchemaDifference::MissingStore {
                    store: declared.name().to_string(),
                }),
                Some(existing) => diff_store(declared, existing, &mut out),
            }
        }
        for existing in live.stores() {
            if self.get_store(existing.name()).is_none() {
                out.push(SchemaDifference::ExtraStore {
                    store: existing.name().to_string(),
                });
            }
        }
        out
    }
}

fn diff_store(declared: &StoreSchema, live: &StoreSchema, out: &mut Vec<SchemaDifference>) {
    let store = declared.name().to_string();
    if declared.key_path() != live.key_path() {
        out.push(SchemaDifference::KeyPathChanged {
            store: store.clone(),
            declared: declared.key_path().cloned(),
            live: live.key_path().cloned(),
        });
    }
    if declared.is_auto_increment() != live.is_auto_increment() {
        out.push(SchemaDifference::AutoIncrementChanged {
            store: store.clone(),
            declared: declared.is_auto_increment(),
        });
    }
    if declared.declared_key_type() != live.declared_key_type() {
        out.push(SchemaDifference::KeyTypeChanged { store: store.clone() });
    }
    for index in declared.indexes() {
        match live.get_index(index.name()) {
            None => out.push(SchemaDifference::MissingIndex {
                store: store.clone(),
                index: index.name().to_string(),
                generator: index.is_generator(),
            }),
            Some(existing) if existing != index => out.push(SchemaDifference::IndexChanged {
                store: store.clone(),
                index: index.name().to_string(),
            }),
            Some(_) => {}
        }
    }
    for existing in live.indexes() {
        if declared.get_index(existing.name()).is_none() {
            out.push(SchemaDifference::ExtraIndex {
                store: store.clone(),
                index: existing.name().to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IndexSchema;

    fn notes(indexes: Vec<IndexSchema>) -> StoreSchema {
        let mut store = StoreSchema::with_key_path("notes", "id").auto_increment(true);
        for index in indexes {
            store = store.index(index);
        }
        store
    }

    #[test]
    fn identical_schemas_have_no_difference() {
        let s = DatabaseSchema::versioned(1, vec![notes(vec![IndexSchema::new("by_tag", "tag")])]);
        assert!(s.diff(&s.clone()).is_empty());
    }

    #[test]
    fn detects_store_additions_and_removals() {
        let declared = DatabaseSchema::auto(vec![notes(vec![])]);
        let live = DatabaseSchema::auto(vec![StoreSchema::new("drafts")]);
        let diff = declared.diff(&live);
        assert_eq!(
            diff,
            vec![
                SchemaDifference::MissingStore { store: "notes".into() },
                SchemaDifference::ExtraStore { store: "drafts".into() },
            ]
        );
    }

    #[test]
    fn detects_key_rule_changes() {
        let declared = DatabaseSchema::auto(vec![notes(vec![])]);
        let live = DatabaseSchema::auto(vec![StoreSchema::with_key_path("notes", "uid")]);
        let diff = declared.diff(&live);
        assert_eq!(diff.len(), 2);
        assert!(diff.iter().all(SchemaDifference::requires_store_recreation));
        assert!(diff[0].to_string().contains("key path id"));
    }

    #[test]
    fn detects_index_changes() {
        let declared = DatabaseSchema::auto(vec![notes(vec![
            IndexSchema::new("by_tag", "tag").unique(true),
            IndexSchema::new("by_day", "day"),
        ])]);
        let live = DatabaseSchema::auto(vec![notes(vec![
            IndexSchema::new("by_tag", "tag"),
            IndexSchema::new("by_old", "old"),
        ])]);
        let diff = declared.diff(&live);
        assert_eq!(
            diff,
            vec![
                SchemaDifference::IndexChanged {
                    store: "notes".into(),
                    index: "by_tag".into()
                },
                SchemaDifference::MissingIndex {
                    store: "notes".into(),
                    index: "by_day".into(),
                    generator: false
                },
                SchemaDifference::ExtraIndex {
                    store: "notes".into(),
                    index: "by_old".into()
                },
            ]
        );
    }
}
