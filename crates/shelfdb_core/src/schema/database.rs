//! Whole-database schema descriptors.

use super::StoreSchema;
use crate::error::{CoreError, CoreResult};
use std::fmt;

/// How a schema versions itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVersion {
    /// A fixed version; opening an older database upgrades it.
    Explicit(u32),
    /// Reconcile against whatever version is live, bumping it by one
    /// whenever the structure has to change.
    Auto,
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(v) => write!(f, "{v}"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// Declared structure of one database.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseSchema {
    version: SchemaVersion,
    stores: Vec<StoreSchema>,
    editable: bool,
}

impl DatabaseSchema {
    /// A schema pinned at `version`.
    #[must_use]
    pub fn versioned(version: u32, stores: Vec<StoreSchema>) -> Self {
        Self {
            version: SchemaVersion::Explicit(version),
            stores,
            editable: false,
        }
    }

    /// An auto-version schema.
    #[must_use]
    pub fn auto(stores: Vec<StoreSchema>) -> Self {
        Self {
            version: SchemaVersion::Auto,
            stores,
            editable: false,
        }
    }

    /// Keeps live stores this schema does not declare instead of deleting
    /// them. Only meaningful for auto-version schemas.
    #[must_use]
    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    /// Adds a store.
    #[must_use]
    pub fn store(mut self, store: StoreSchema) -> Self {
        self.stores.push(store);
        self
    }

    /// Declared version.
    #[must_use]
    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    /// Whether undeclared live stores are adopted.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        self.editable
    }

    /// Stores in declaration order.
    #[must_use]
    pub fn stores(&self) -> &[StoreSchema] {
        &self.stores
    }

    /// Looks up a store by name.
    #[must_use]
    pub fn get_store(&self, name: &str) -> Option<&StoreSchema> {
        self.stores.iter().find(|s| s.name() == name)
    }

    /// Names of all stores.
    #[must_use]
    pub fn store_names(&self) -> Vec<&str> {
        self.stores.iter().map(StoreSchema::name).collect()
    }

    pub(crate) fn stores_mut(&mut self) -> &mut Vec<StoreSchema> {
        &mut self.stores
    }

    /// Returns a copy extended with every live store this schema does not
    /// declare, for editable schemas.
    #[must_use]
    pub(crate) fn adopting(&self, live: &DatabaseSchema) -> DatabaseSchema {
        let mut merged = self.clone();
        if self.editable {
            for store in live.stores() {
                if merged.get_store(store.name()).is_none() {
                    merged.stores.push(store.clone());
                }
            }
        }
        merged
    }

    /// Checks every store and that store names are unique.
    ///
    /// # Errors
    ///
    /// Returns `Argument` describing the first problem found.
    pub fn validate(&self) -> CoreResult<()> {
        if self.editable && self.version != SchemaVersion::Auto {
            return Err(CoreError::argument(
                "only auto-version schemas can be editable",
            ));
        }
        if self.version == SchemaVersion::Explicit(0) {
            return Err(CoreError::argument("schema version must be at least 1"));
        }
        for (i, store) in self.stores.iter().enumerate() {
            store.validate()?;
            if self.stores[..i].iter().any(|s| s.name() == store.name()) {
                return Err(CoreError::argument(format!(
                    "duplicate store '{}'",
                    store.name()
                )));
            }
        }
        Ok(())
    }
}
