//! File-backed session storage.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::debug;

use crate::domain::errors::StorageError;
use crate::domain::ports::SessionStoragePort;
use crate::infrastructure::config::app_config::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER};

const FILE_EXTENSION: &str = "json";

/// Stores each key as `<key>.json` inside one directory.
///
/// Writes go through a temp file in the same directory that is flushed to disk
/// and then renamed into place, so a crash never leaves a half-written record
/// behind.
pub struct FileSessionStorage {
    dir: PathBuf,
}

impl FileSessionStorage {
    /// Uses the platform data directory.
    ///
    /// # Errors
    /// Returns error if no data directory can be determined.
    pub fn new() -> Result<Self, StorageError> {
        let dir = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| StorageError::unavailable("no data directory for this platform"))?;

        Ok(Self::with_dir(dir))
    }

    /// Uses `dir`, created on first write.
    #[must_use]
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the records.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
            });
        }

        Ok(self.dir.join(format!("{key}.{FILE_EXTENSION}")))
    }
}

impl SessionStoragePort for FileSessionStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;

        match fs::read_to_string(&path) {
            Ok(content) => {
                debug!(path = %path.display(), "Read stored record");
                Ok(Some(content))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::read_failed(key, e.to_string())),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let write_failed = |e: std::io::Error| StorageError::write_failed(key, e.to_string());

        fs::create_dir_all(&self.dir).map_err(write_failed)?;
        let mut temp_file = tempfile::NamedTempFile::new_in(&self.dir).map_err(write_failed)?;
        temp_file.write_all(value.as_bytes()).map_err(write_failed)?;
        temp_file.as_file().sync_all().map_err(write_failed)?;
        temp_file.persist(&path).map_err(|e| write_failed(e.error))?;

        debug!(path = %path.display(), bytes = value.len(), "Wrote stored record");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Removed stored record");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::remove_failed(key, e.to_string())),
        }
    }
}
