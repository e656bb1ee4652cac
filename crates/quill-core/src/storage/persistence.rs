//! Durable record persistence
//!
//! Handles saving and loading the entry record to/from the filesystem.
//! Uses atomic writes (write to temp file, then rename) so a reader never
//! observes a partially-written record: after a crash the file holds either
//! the old or the new record.
//!
//! Storage location: `~/.local/share/quill/entries.json` (configurable via
//! `Config`)

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{StorageError, StorageResult};
use crate::models::Entry;

/// The single durable record holding the collection and sync metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreRecord {
    /// The entry collection
    #[serde(default)]
    pub entries: Vec<Entry>,
    /// When the last reconciliation cycle completed
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    /// When the collection was last saved
    #[serde(default)]
    pub last_saved_at: Option<DateTime<Utc>>,
    /// Last-applied category filter
    #[serde(default)]
    pub last_filter: Option<String>,
}

/// Persistence layer for the durable record
pub struct JsonPersistence {
    path: PathBuf,
}

impl JsonPersistence {
    /// Create a persistence handler for the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the record file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if a record exists on disk
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the record
    ///
    /// Returns `None` if the file doesn't exist.
    /// Returns an error if the file exists but can't be read or parsed.
    pub fn load(&self) -> StorageResult<Option<StoreRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&self.path).map_err(|source| StorageError::Read {
            path: self.path.clone(),
            source,
        })?;

        let record =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
                path: self.path.clone(),
                details: e.to_string(),
            })?;

        Ok(Some(record))
    }

    /// Save the record using an atomic write
    pub fn save(&self, record: &StoreRecord) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(record)?;
        atomic_write(&self.path, &bytes)?;
        debug!(
            "Saved {} entries to {:?}",
            record.entries.len(),
            self.path
        );
        Ok(())
    }
}

/// Replace `path` with `data` so readers see the old or the new bytes
///
/// The data goes to a sibling temp file which is synced and then renamed
/// over `path`. A failed rename removes the temp file.
pub fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::Directory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    // Same directory, so the rename stays on one filesystem
    let temp_path = path.with_extension("tmp");
    write_synced(&temp_path, data).map_err(|e| StorageError::io(temp_path.clone(), e))?;

    if let Err(source) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(StorageError::Rename {
            from: temp_path,
            to: path.to_path_buf(),
            source,
        });
    }

    Ok(())
}

fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_record() -> StoreRecord {
        StoreRecord {
            entries: vec![Entry::new("Hello", "Greeting").unwrap()],
            last_sync: None,
            last_saved_at: Some(Utc::now()),
            last_filter: Some("Greeting".to_string()),
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = JsonPersistence::new(temp_dir.path().join("entries.json"));

        assert!(!persistence.exists());
        assert!(persistence.load().unwrap().is_none());

        let record = sample_record();
        persistence.save(&record).unwrap();
        assert!(persistence.exists());

        let loaded = persistence.load().unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("entries.json");
        let persistence = JsonPersistence::new(&path);

        persistence.save(&sample_record()).unwrap();
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_corrupt_record_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("entries.json");
        fs::write(&path, b"{ not json").unwrap();

        let persistence = JsonPersistence::new(&path);
        let err = persistence.load().unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn test_missing_fields_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("entries.json");
        fs::write(&path, b"{}").unwrap();

        let record = JsonPersistence::new(&path).load().unwrap().unwrap();
        assert!(record.entries.is_empty());
        assert!(record.last_sync.is_none());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir
            .path()
            .join("a")
            .join("b")
            .join("c")
            .join("file.txt");

        atomic_write(&nested_path, b"test data").unwrap();

        let content = fs::read_to_string(&nested_path).unwrap();
        assert_eq!(content, "test data");
    }

    #[test]
    fn test_atomic_write_fails_under_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let err = atomic_write(&blocker.join("entries.json"), b"data").unwrap_err();
        assert!(matches!(err, StorageError::Directory { .. }));
    }
}
