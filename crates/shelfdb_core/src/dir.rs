//! Storage directory management.
//!
//! A pool persists its databases in one directory:
//!
//! ```text
//! <storage_dir>/
//! ├─ LOCK                # Advisory lock, one process per directory
//! ├─ notes.journal       # One journal per database
//! └─ site-1.journal
//! ```

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const JOURNAL_EXT: &str = "journal";

/// An exclusively locked storage directory.
#[derive(Debug)]
pub struct StorageDir {
    path: PathBuf,
    _lock_file: File,
}

impl StorageDir {
    /// Opens (creating if needed) and locks a storage directory.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseLocked` if another process holds the lock, or an
    /// I/O error if the path exists but is not a directory.
    pub fn open(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        if !path.is_dir() {
            return Err(CoreError::argument(format!(
                "storage path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::DatabaseLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// The directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the journal for database `name`.
    ///
    /// # Errors
    ///
    /// Returns `Argument` for names that are not plain file stems.
    pub fn journal_path(&self, name: &str) -> CoreResult<PathBuf> {
        validate_name(name)?;
        Ok(self.path.join(format!("{name}.{JOURNAL_EXT}")))
    }

    /// Names of every database with a journal here, sorted.
    pub fn database_names(&self) -> CoreResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(JOURNAL_EXT) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Deletes the journal of `name`. Returns whether one existed.
    pub fn remove_journal(&self, name: &str) -> CoreResult<bool> {
        let path = self.journal_path(name)?;
        if path.exists() {
            fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// Checks a database name is usable as a file stem.
pub(crate) fn validate_name(name: &str) -> CoreResult<()> {
    let ok = !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !name.starts_with('.');
    if ok {
        Ok(())
    } else {
        Err(CoreError::argument(format!("invalid database name '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_open_is_locked() {
        let dir = tempdir().unwrap();
        let first = StorageDir::open(dir.path()).unwrap();
        let second = StorageDir::open(dir.path());
        assert!(matches!(second, Err(CoreError::DatabaseLocked)));
        drop(first);
        assert!(StorageDir::open(dir.path()).is_ok());
    }

    #[test]
    fn lists_and_removes_journals() {
        let dir = tempdir().unwrap();
        let storage = StorageDir::open(dir.path()).unwrap();
        fs::write(storage.journal_path("b").unwrap(), b"").unwrap();
        fs::write(storage.journal_path("a").unwrap(), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        assert_eq!(storage.database_names().unwrap(), vec!["a", "b"]);
        assert!(storage.remove_journal("a").unwrap());
        assert!(!storage.remove_journal("a").unwrap());
    }

    #[test]
    fn rejects_path_like_names() {
        assert!(validate_name("site-1_main.v2").is_ok());
        for bad in ["", "../x", "a/b", ".hidden", "a b"] {
            assert!(validate_name(bad).is_err(), "{bad}");
        }
    }
}
