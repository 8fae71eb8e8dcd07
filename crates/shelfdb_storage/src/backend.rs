//! Storage backend trait definition.

use crate::error::StorageResult;

/// An append-only byte store holding one database journal.
///
/// # Invariants
///
/// - `append` returns the offset where data was written
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `replace` swaps the whole content atomically: a crash leaves either
///   the old bytes or the new bytes, never a mix
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `ReadPastEnd` if the range extends beyond the current size.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data and returns the offset it was written at.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered writes to the operating system.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the current size in bytes; the next append lands here.
    fn size(&self) -> StorageResult<u64>;

    /// Makes data and metadata durable.
    fn sync(&mut self) -> StorageResult<()>;

    /// Shrinks storage to `new_size`, dropping a torn tail after recovery.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTruncate` if `new_size` exceeds the current size.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Replaces the entire content with `data`.
    fn replace(&mut self, data: &[u8]) -> StorageResult<()>;

    /// Reads everything currently stored.
    #[allow(clippy::cast_possible_truncation)]
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let size = self.size()?;
        self.read_at(0, size as usize)
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        (**self).read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        (**self).append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        (**self).flush()
    }

    fn size(&self) -> StorageResult<u64> {
        (**self).size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        (**self).sync()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        (**self).truncate(new_size)
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        (**self).replace(data)
    }

    fn read_all(&self) -> StorageResult<Vec<u8>> {
        (**self).read_all()
    }
}
