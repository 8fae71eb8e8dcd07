//! # shelfdb storage
//!
//! Byte stores that hold shelfdb database journals.
//!
//! A backend is an append-only byte log with random reads. It knows
//! nothing about journal frames, records or schemas; `shelfdb_core`
//! owns every byte it writes.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] keeps bytes in a shared buffer; clones see the
//!   same bytes, which lets tests inspect or damage a journal in place.
//! - [`FileBackend`] appends to a file and compacts by atomic rename.
//!
//! ## Example
//!
//! ```rust
//! use shelfdb_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"frame").unwrap();
//! assert_eq!(backend.read_at(offset, 5).unwrap(), b"frame");
//!
//! backend.replace(b"compacted").unwrap();
//! assert_eq!(backend.read_all().unwrap(), b"compacted");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
