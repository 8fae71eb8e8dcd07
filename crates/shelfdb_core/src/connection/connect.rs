//! The connect state machine.
//!
//! ```text
//! Probing ──▶ Diffing ──▶ Stable
//!                │          ▲
//!                ▼          │
//!            Upgrading ──▶ Reopening
//! ```
//!
//! `Probing` reads the live version, `Diffing` compares the declared schema
//! with the live structure and picks a target version, `Upgrading` applies
//! the planned changes under the exclusive version lock, and `Reopening`
//! checks the result matches before the connection becomes `Stable`.

use super::pool::SharedDatabase;
use super::upgrade::{apply_change, plan_changes, SchemaChange};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::journal::JournalRecord;
use crate::schema::{DatabaseSchema, IndexSchema, SchemaDifference, SchemaVersion};
use crate::types::ConnectionId;
use tracing::{debug, info, warn};

/// Outcome of a successful connect.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConnectReport {
    /// Version the connection is open at.
    pub version: u32,
    /// Structural changes applied while connecting, in order.
    pub changes: Vec<SchemaChange>,
    /// Version before the upgrade, when one ran.
    pub upgraded_from: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Probing,
    Diffing { live: u32 },
    Upgrading { from: u32, to: u32 },
    Reopening { version: u32 },
    Stable { version: u32 },
}

pub(crate) struct Connector<'a> {
    declared: &'a DatabaseSchema,
    shared: &'a SharedDatabase,
    config: &'a Config,
    changes: Vec<SchemaChange>,
    upgraded_from: Option<u32>,
    requester: Option<ConnectionId>,
}

impl<'a> Connector<'a> {
    pub(crate) fn new(declared: &'a DatabaseSchema, shared: &'a SharedDatabase, config: &'a Config) -> Self {
        Self {
            declared,
            shared,
            config,
            changes: Vec::new(),
            upgraded_from: None,
            requester: None,
        }
    }

    /// Upgrades on behalf of an open connection, which stays open.
    pub(crate) fn requested_by(mut self, id: ConnectionId) -> Self {
        self.requester = Some(id);
        self
    }

    pub(crate) fn run(mut self) -> CoreResult<ConnectReport> {
        let mut phase = Phase::Probing;
        loop {
            debug!(database = %self.shared.name(), ?phase, "connect");
            phase = match phase {
                Phase::Probing => self.probe()?,
                Phase::Diffing { live } => self.diff(live)?,
                Phase::Upgrading { from, to } => self.upgrade(from, to)?,
                Phase::Reopening { version } => self.reopen(version)?,
                Phase::Stable { version } => return self.stabilize(version),
            };
        }
    }

    fn conflict(&self, version: u32, differences: Vec<SchemaDifference>) -> CoreError {
        CoreError::SchemaConflict {
            name: self.shared.name().to_string(),
            version,
            differences,
        }
    }

    fn probe(&self) -> CoreResult<Phase> {
        let live = self.shared.state.read().version();
        if let SchemaVersion::Explicit(requested) = self.declared.version() {
            if requested < live {
                return Err(CoreError::VersionTooLow {
                    name: self.shared.name().to_string(),
                    requested,
                    current: live,
                });
            }
        }
        Ok(Phase::Diffing { live })
    }

    fn diff(&self, live: u32) -> CoreResult<Phase> {
        if live == 0 {
            let to = match self.declared.version() {
                SchemaVersion::Explicit(v) => v,
                SchemaVersion::Auto => 1,
            };
            return Ok(Phase::Upgrading { from: 0, to });
        }

        let live_schema = self.shared.state.read().schema();
        let differences = self.declared.adopting(&live_schema).diff(&live_schema);
        match self.declared.version() {
            SchemaVersion::Explicit(v) if v > live => Ok(Phase::Upgrading { from: live, to: v }),
            SchemaVersion::Explicit(v) if differences.is_empty() => Ok(Phase::Stable { version: v }),
            SchemaVersion::Explicit(v) => Err(self.conflict(v, differences)),
            SchemaVersion::Auto if differences.is_empty() => Ok(Phase::Stable { version: live }),
            SchemaVersion::Auto => {
                debug!(
                    database = %self.shared.name(),
                    differences = differences.len(),
                    "auto-version schema differs from live structure"
                );
                Ok(Phase::Upgrading {
                    from: live,
                    to: live + 1,
                })
            }
        }
    }

    fn upgrade(&mut self, from: u32, to: u32) -> CoreResult<Phase> {
        if from > 0 {
            self.shared.request_version_change(Some(to), self.requester)?;
        }
        let _exclusive = self.shared.lock_exclusive(self.config.connect_timeout, "upgrade")?;
        let mut state = self.shared.state.write();
        if state.version() != from {
            // another connection upgraded first
            return Ok(Phase::Probing);
        }

        let live = state.schema();
        let changes = plan_changes(&self.declared.adopting(&live), &live);
        let mut next = state.clone();
        for change in &changes {
            if change.is_destructive() {
                warn!(database = %self.shared.name(), %change, "destructive schema change");
            }
            apply_change(&mut next, change)?;
        }
        next.set_version(to);

        self.shared.append(&JournalRecord::Upgrade {
            version: to,
            changes: changes.clone(),
        })?;
        *state = next;

        info!(
            database = %self.shared.name(),
            from,
            to,
            changes = changes.len(),
            "upgraded database"
        );
        self.upgraded_from.get_or_insert(from);
        self.changes.extend(changes);
        Ok(Phase::Reopening { version: to })
    }

    fn reopen(&self, version: u32) -> CoreResult<Phase> {
        let state = self.shared.state.read();
        let live = state.schema();
        let differences = self.declared.adopting(&live).diff(&live);
        if !differences.is_empty() {
            return Err(self.conflict(version, differences));
        }
        Ok(Phase::Stable {
            version: state.version(),
        })
    }

    fn stabilize(self, version: u32) -> CoreResult<ConnectReport> {
        let derived: Vec<_> = self
            .declared
            .stores()
            .iter()
            .filter(|s| s.indexes().iter().any(IndexSchema::is_generator))
            .collect();
        if !derived.is_empty() {
            let _writer = self
                .shared
                .write_lock
                .try_lock_for(self.config.lock_timeout)
                .ok_or_else(|| CoreError::Timeout {
                    operation: format!("attach index generators on '{}'", self.shared.name()),
                    millis: self.config.lock_timeout.as_millis(),
                })?;
            let mut state = self.shared.state.write();
            for declared in derived {
                if let Some(store) = state.store_mut(declared.name()) {
                    store.adopt_generators(declared);
                }
            }
        }
        Ok(ConnectReport {
            version,
            changes: self.changes,
            upgraded_from: self.upgraded_from,
        })
    }
}
