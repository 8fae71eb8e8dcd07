//! Schema model.
//!
//! Pure descriptions of databases, stores and indexes. The only behavior
//! here is validation and [`DatabaseSchema::diff`], which the connection
//! manager uses to decide whether a migration is needed.

mod codec;
mod database;
mod diff;
mod index;
mod key_path;
mod registry;
mod store;

pub use codec::{index_from_value, index_to_value, store_from_value, store_to_value};
pub use database::{DatabaseSchema, SchemaVersion};
pub use diff::SchemaDifference;
pub use index::{DataType, IndexGenerator, IndexSchema};
pub use key_path::KeyPath;
pub use registry::SchemaRegistry;
pub use store::StoreSchema;
