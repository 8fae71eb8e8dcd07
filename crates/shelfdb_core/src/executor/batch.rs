//! Positional results of batch requests.

use crate::error::CoreError;
use shelfdb_codec::Key;
use std::fmt;

/// Identity of one record: its store and primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordRef {
    /// Store name.
    pub store: String,
    /// Primary key.
    pub key: Key,
}

impl RecordRef {
    /// Creates a reference.
    pub fn new(store: impl Into<String>, key: impl Into<Key>) -> Self {
        Self {
            store: store.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.store, self.key)
    }
}

/// One slot per request item, in request order.
///
/// A failed item holds its error; the other items are unaffected.
#[derive(Debug)]
pub struct BatchResult<T> {
    items: Vec<Result<T, CoreError>>,
    has_error: bool,
}

impl<T> BatchResult<T> {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            items: Vec::with_capacity(n),
            has_error: false,
        }
    }

    pub(crate) fn push(&mut self, item: Result<T, CoreError>) {
        self.has_error |= item.is_err();
        self.items.push(item);
    }

    /// True when at least one item failed.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.has_error
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True for an empty request.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Slot `i`.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<&Result<T, CoreError>> {
        self.items.get(i)
    }

    /// Every slot, in request order.
    #[must_use]
    pub fn items(&self) -> &[Result<T, CoreError>] {
        &self.items
    }

    /// Consumes the result into its slots.
    #[must_use]
    pub fn into_items(self) -> Vec<Result<T, CoreError>> {
        self.items
    }

    /// Failed slots with their positions.
    pub fn errors(&self) -> impl Iterator<Item = (usize, &CoreError)> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().err().map(|e| (i, e)))
    }

    /// Successful values, skipping failed slots.
    pub fn successes(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter_map(|r| r.as_ref().ok())
    }

    /// Every value, or the first error.
    pub fn into_result(self) -> Result<Vec<T>, CoreError> {
        self.items.into_iter().collect()
    }
}

impl BatchResult<usize> {
    /// Sum over successful slots.
    #[must_use]
    pub fn total(&self) -> usize {
        self.successes().sum()
    }
}

impl<T> FromIterator<Result<T, CoreError>> for BatchResult<T> {
    fn from_iter<I: IntoIterator<Item = Result<T, CoreError>>>(iter: I) -> Self {
        let mut out = Self::with_capacity(0);
        for item in iter {
            out.push(item);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_failures_by_position() {
        let batch: BatchResult<usize> = vec![Ok(1), Err(CoreError::argument("x")), Ok(0)]
            .into_iter()
            .collect();
        assert!(batch.has_error());
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.errors().map(|(i, _)| i).collect::<Vec<_>>(), vec![1]);
        assert_eq!(batch.total(), 1);
        assert!(batch.into_result().is_err());
    }

    #[test]
    fn clean_batch() {
        let batch: BatchResult<usize> = vec![Ok(2), Ok(3)].into_iter().collect();
        assert!(!batch.has_error());
        assert_eq!(batch.into_result().unwrap(), vec![2, 3]);
        assert_eq!(RecordRef::new("notes", 4).to_string(), "notes:4");
    }
}
