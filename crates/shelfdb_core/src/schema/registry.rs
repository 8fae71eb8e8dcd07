//! Per-site schema registration.
//!
//! Feature modules register the stores they need under a site id at
//! startup. Each site ends up as one physical database whose schema is the
//! union of everything registered for it.

use super::{DatabaseSchema, StoreSchema};
use crate::error::{CoreError, CoreResult};
use std::collections::BTreeMap;

/// Collects store descriptors by site.
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    sites: BTreeMap<String, Vec<StoreSchema>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers stores for `site`.
    ///
    /// Registering an identical store twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `Argument` when a store with the same name but a different
    /// definition is already registered for the site, or when a store is
    /// itself invalid.
    pub fn register(
        &mut self,
        site: &str,
        stores: impl IntoIterator<Item = StoreSchema>,
    ) -> CoreResult<()> {
        let registered = self.sites.entry(site.to_string()).or_default();
        for store in stores {
            store.validate()?;
            match registered.iter().find(|s| s.name() == store.name()) {
                Some(existing) if *existing == store => {}
                Some(_) => {
                    return Err(CoreError::argument(format!(
                        "site '{site}': store '{}' registered twice with different definitions",
                        store.name()
                    )))
                }
                None => registered.push(store),
            }
        }
        Ok(())
    }

    /// Site ids with at least one registration.
    pub fn sites(&self) -> impl Iterator<Item = &str> {
        self.sites.keys().map(String::as_str)
    }

    /// The merged auto-version schema for `site`, or `None` when nothing
    /// was registered for it.
    #[must_use]
    pub fn schema_for(&self, site: &str) -> Option<DatabaseSchema> {
        self.sites
            .get(site)
            .map(|stores| DatabaseSchema::auto(stores.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IndexSchema;

    #[test]
    fn merges_registrations_per_site() {
        let mut registry = SchemaRegistry::new();
        registry
            .register("site-a", [StoreSchema::with_key_path("files", "url")])
            .unwrap();
        registry
            .register(
                "site-a",
                [
                    StoreSchema::with_key_path("files", "url"),
                    StoreSchema::new("queue").index(IndexSchema::new("by_course", "courseid")),
                ],
            )
            .unwrap();
        registry.register("site-b", [StoreSchema::new("queue")]).unwrap();

        let schema = registry.schema_for("site-a").unwrap();
        assert_eq!(schema.store_names(), vec!["files", "queue"]);
        assert_eq!(registry.sites().collect::<Vec<_>>(), vec!["site-a", "site-b"]);
        assert!(registry.schema_for("site-c").is_none());
    }

    #[test]
    fn conflicting_definitions_rejected() {
        let mut registry = SchemaRegistry::new();
        registry.register("s", [StoreSchema::new("files")]).unwrap();
        let err = registry
            .register("s", [StoreSchema::with_key_path("files", "id")])
            .unwrap_err();
        assert!(matches!(err, CoreError::Argument { .. }));
    }
}
