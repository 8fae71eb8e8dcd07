//! Framed journal writer and reader.

use super::record::{compute_crc32, JournalRecord, RecordType, JOURNAL_MAGIC, JOURNAL_VERSION};
use crate::error::{CoreError, CoreResult};
use shelfdb_storage::StorageBackend;
use tracing::warn;

/// magic (4) + version (2) + type (1) + length (4)
const HEADER_SIZE: usize = 11;

const CRC_SIZE: usize = 4;

/// Result of reading every frame of a journal.
#[derive(Debug, Default)]
pub struct FrameScan {
    /// Valid records with the offset of their frame.
    pub records: Vec<(u64, JournalRecord)>,
    /// Bytes covered by valid frames.
    pub valid_len: u64,
    /// Why reading stopped early, when a torn trailing frame was found.
    pub torn_tail: Option<String>,
}

/// Append-only journal of framed records over a storage backend.
pub struct Journal {
    backend: Box<dyn StorageBackend>,
    sync_on_commit: bool,
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("sync_on_commit", &self.sync_on_commit)
            .finish_non_exhaustive()
    }
}

impl Journal {
    /// Wraps a backend.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend,
            sync_on_commit,
        }
    }

    /// Builds one frame.
    pub fn encode_frame(record: &JournalRecord) -> CoreResult<Vec<u8>> {
        let payload = record.encode_payload()?;
        let len = u32::try_from(payload.len())
            .map_err(|_| CoreError::invalid_operation("journal record payload too large"))?;

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&JOURNAL_MAGIC);
        data.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
        data.push(record.record_type().as_byte());
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&payload);
        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        Ok(data)
    }

    /// Appends a record, returning the offset of its frame.
    ///
    /// A failed append cuts the journal back to where it started, so the
    /// next frame still begins on a frame boundary.
    pub fn append(&mut self, record: &JournalRecord) -> CoreResult<u64> {
        let frame = Self::encode_frame(record)?;
        let start = self.backend.size()?;
        self.write_frame(&frame).map_err(|err| {
            if let Err(cleanup) = self.backend.truncate(start) {
                warn!(error = %cleanup, offset = start, "could not drop partial journal frame");
            }
            err
        })
    }

    fn write_frame(&mut self, frame: &[u8]) -> CoreResult<u64> {
        let offset = self.backend.append(frame)?;
        self.backend.flush()?;
        if self.sync_on_commit {
            self.backend.sync()?;
        }
        Ok(offset)
    }

    /// Current journal size in bytes.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.size()?)
    }

    /// Reads every frame without modifying the journal.
    ///
    /// A frame cut short by the end of the journal, or a final frame whose
    /// checksum fails, is reported as a torn tail. The same faults followed
    /// by more data are corruption.
    ///
    /// # Errors
    ///
    /// Returns `JournalCorrupted` for bad magic, an unknown version or type,
    /// a checksum failure before the last frame, or an undecodable payload.
    pub fn read_frames(&self) -> CoreResult<FrameScan> {
        let data = self.backend.read_all()?;
        let mut scan = FrameScan::default();
        let mut pos = 0usize;

        while pos < data.len() {
            let offset = pos as u64;
            if data.len() - pos < HEADER_SIZE {
                scan.torn_tail = Some(format!("incomplete header at offset {offset}"));
                break;
            }
            let header = &data[pos..pos + HEADER_SIZE];
            if header[0..4] != JOURNAL_MAGIC {
                return Err(CoreError::journal_corrupted(offset, "invalid magic"));
            }
            let version = u16::from_le_bytes([header[4], header[5]]);
            if version > JOURNAL_VERSION {
                return Err(CoreError::journal_corrupted(
                    offset,
                    format!("unsupported version {version}"),
                ));
            }
            let record_type = RecordType::from_byte(header[6]).ok_or_else(|| {
                CoreError::journal_corrupted(offset, format!("unknown record type {}", header[6]))
            })?;
            let len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as usize;

            let end = pos + HEADER_SIZE + len + CRC_SIZE;
            if end > data.len() {
                scan.torn_tail = Some(format!("incomplete frame at offset {offset}"));
                break;
            }
            let body_end = end - CRC_SIZE;
            let stored = u32::from_le_bytes([
                data[body_end],
                data[body_end + 1],
                data[body_end + 2],
                data[body_end + 3],
            ]);
            if compute_crc32(&data[pos..body_end]) != stored {
                if end == data.len() {
                    scan.torn_tail = Some(format!("checksum mismatch in last frame at offset {offset}"));
                    break;
                }
                return Err(CoreError::journal_corrupted(offset, "checksum mismatch"));
            }

            let record = JournalRecord::decode_payload(record_type, &data[pos + HEADER_SIZE..body_end])
                .map_err(|e| CoreError::journal_corrupted(offset, e.to_string()))?;
            scan.records.push((offset, record));
            pos = end;
            scan.valid_len = pos as u64;
        }
        Ok(scan)
    }

    /// Reads every record, cutting off a torn tail so later appends start
    /// on a frame boundary.
    pub fn recover(&mut self) -> CoreResult<Vec<JournalRecord>> {
        let scan = self.read_frames()?;
        if let Some(reason) = &scan.torn_tail {
            warn!(reason = %reason, valid_len = scan.valid_len, "dropping torn journal tail");
            self.backend.truncate(scan.valid_len)?;
            self.backend.sync()?;
        }
        Ok(scan.records.into_iter().map(|(_, r)| r).collect())
    }

    /// Atomically replaces the journal with `records`.
    pub fn rewrite(&mut self, records: &[JournalRecord]) -> CoreResult<()> {
        let mut data = Vec::new();
        for record in records {
            data.extend_from_slice(&Self::encode_frame(record)?);
        }
        self.backend.replace(&data)?;
        Ok(())
    }
}
