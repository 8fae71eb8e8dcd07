//! Small shared types: identifiers, transaction modes and cursor directions.

use std::fmt;

/// Unique identifier for a transaction.
///
/// Transaction IDs increase monotonically per database and are never reused
/// while the database stays loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Identifier of one open connection within a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

/// Access mode of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionMode {
    /// Reads only; any write fails with `ReadOnly`.
    ReadOnly,
    /// Reads and writes. One read-write transaction runs at a time.
    ReadWrite,
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "readonly"),
            Self::ReadWrite => write!(f, "readwrite"),
        }
    }
}

/// Traversal order of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Ascending keys, every record.
    #[default]
    Next,
    /// Ascending keys, first record of each distinct key.
    NextUnique,
    /// Descending keys, every record.
    Prev,
    /// Descending keys, first record of each distinct key.
    PrevUnique,
}

impl Direction {
    /// Builds a direction from the `reverse` and `unique` flags.
    #[must_use]
    pub const fn from_flags(reverse: bool, unique: bool) -> Self {
        match (reverse, unique) {
            (false, false) => Self::Next,
            (false, true) => Self::NextUnique,
            (true, false) => Self::Prev,
            (true, true) => Self::PrevUnique,
        }
    }

    /// True for ascending directions.
    #[must_use]
    pub const fn is_forward(self) -> bool {
        matches!(self, Self::Next | Self::NextUnique)
    }

    /// True for directions that skip duplicate keys.
    #[must_use]
    pub const fn is_unique(self) -> bool {
        matches!(self, Self::NextUnique | Self::PrevUnique)
    }

    /// The same uniqueness walking the other way.
    #[must_use]
    pub const fn reversed(self) -> Self {
        Self::from_flags(self.is_forward(), self.is_unique())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_flags() {
        assert_eq!(Direction::from_flags(true, true), Direction::PrevUnique);
        assert!(Direction::NextUnique.is_unique());
        assert!(!Direction::Prev.is_forward());
        assert_eq!(Direction::Next.reversed(), Direction::Prev);
        assert_eq!(Direction::PrevUnique.reversed(), Direction::NextUnique);
    }

    #[test]
    fn ids_display() {
        assert_eq!(TransactionId::new(7).to_string(), "txn:7");
        assert_eq!(ConnectionId(2).to_string(), "conn:2");
    }
}
