//! In-memory storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// A memory-resident backend.
///
/// Clones share one buffer. A test can keep a clone, hand the other to a
/// journal, and later read or corrupt the exact bytes the journal wrote.
///
/// ```rust
/// use shelfdb_storage::{InMemoryBackend, StorageBackend};
///
/// let mut backend = InMemoryBackend::new();
/// let observer = backend.clone();
/// backend.append(b"abc").unwrap();
/// assert_eq!(observer.data(), b"abc");
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryBackend {
    data: Arc<RwLock<Vec<u8>>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding `data`, for recovery tests.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Returns a copy of the stored bytes.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Overwrites one byte in place. Out-of-range offsets are ignored.
    pub fn corrupt_byte(&self, offset: usize, value: u8) {
        if let Some(byte) = self.data.write().get_mut(offset) {
            *byte = value;
        }
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let start = usize::try_from(offset).ok().filter(|s| *s <= data.len());
        match start.and_then(|s| s.checked_add(len).map(|e| (s, e))) {
            Some((s, e)) if e <= data.len() => Ok(data[s..e].to_vec()),
            _ => Err(StorageError::ReadPastEnd { offset, len, size }),
        }
    }

    fn append(&mut self, new_data: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        let size = data.len() as u64;
        if new_size > size {
            return Err(StorageError::InvalidTruncate {
                requested: new_size,
                size,
            });
        }
        data.truncate(new_size as usize);
        Ok(())
    }

    fn replace(&mut self, new_data: &[u8]) -> StorageResult<()> {
        *self.data.write() = new_data.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_returns_offsets() {
        let mut backend = InMemoryBackend::new();
        assert_eq!(backend.append(b"hello").unwrap(), 0);
        assert_eq!(backend.append(b" world").unwrap(), 5);
        assert_eq!(backend.read_at(0, 11).unwrap(), b"hello world");
        assert_eq!(backend.read_at(6, 5).unwrap(), b"world");
    }

    #[test]
    fn read_past_end_fails() {
        let backend = InMemoryBackend::with_data(b"abc".to_vec());
        assert!(matches!(
            backend.read_at(2, 2),
            Err(StorageError::ReadPastEnd { offset: 2, len: 2, size: 3 })
        ));
        assert!(backend.read_at(u64::MAX, 1).is_err());
        assert!(backend.read_at(3, 0).unwrap().is_empty());
    }

    #[test]
    fn truncate_only_shrinks() {
        let mut backend = InMemoryBackend::with_data(b"abcdef".to_vec());
        backend.truncate(2).unwrap();
        assert_eq!(backend.data(), b"ab");
        assert!(matches!(
            backend.truncate(10),
            Err(StorageError::InvalidTruncate { requested: 10, size: 2 })
        ));
    }

    #[test]
    fn clones_share_bytes() {
        let mut backend = InMemoryBackend::new();
        let observer = backend.clone();
        backend.append(b"xyz").unwrap();
        observer.corrupt_byte(1, b'Y');
        assert_eq!(backend.read_all().unwrap(), b"xYz");
        backend.replace(b"").unwrap();
        assert_eq!(observer.size().unwrap(), 0);
    }

    proptest::proptest! {
        #[test]
        fn appended_chunks_read_back_at_their_offsets(
            chunks in proptest::collection::vec(proptest::collection::vec(proptest::num::u8::ANY, 0..32), 0..16),
        ) {
            let mut backend = InMemoryBackend::new();
            let offsets: Vec<u64> = chunks.iter().map(|c| backend.append(c).unwrap()).collect();
            for (chunk, offset) in chunks.iter().zip(offsets) {
                proptest::prop_assert_eq!(&backend.read_at(offset, chunk.len()).unwrap(), chunk);
            }
            let total: usize = chunks.iter().map(Vec::len).sum();
            proptest::prop_assert_eq!(backend.size().unwrap(), total as u64);
        }
    }
}
