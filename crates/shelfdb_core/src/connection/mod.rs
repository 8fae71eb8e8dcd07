//! Connection management.
//!
//! A [`ConnectionPool`] loads each named database once and hands out
//! [`Connection`]s to it. Connecting reconciles the live structure with a
//! declared [`DatabaseSchema`](crate::DatabaseSchema), upgrading the
//! database when the declared version is higher (or, for auto-version
//! schemas, whenever the structure differs).

mod connect;
mod handle;
mod listener;
mod pool;
mod upgrade;

pub use connect::ConnectReport;
pub use handle::Connection;
pub use listener::{ConnectionListener, VersionChangeEvent, VersionChangeResponse};
pub use pool::ConnectionPool;
pub use upgrade::SchemaChange;

pub(crate) use upgrade::{apply_change, plan_changes};
