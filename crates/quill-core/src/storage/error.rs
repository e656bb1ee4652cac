//! Storage errors
//!
//! Every failure of the durable record surfaces as a `StorageError`. I/O
//! failures are classified so callers can tell a full disk from a
//! permissions problem and offer a way out.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Durable record failure
#[derive(Error, Debug)]
pub enum StorageError {
    /// Data directory could not be created
    #[error("Cannot create data directory '{path}': {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied for '{path}'")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No space left, or the user's quota is used up
    #[error("Out of space writing '{path}'")]
    QuotaExceeded {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The record on disk is not valid JSON of the expected shape
    #[error("Entry record '{path}' is corrupt: {details}")]
    Corrupt { path: PathBuf, details: String },

    /// Import input was rejected before anything changed
    #[error("Invalid import data: {0}")]
    InvalidImport(String),

    #[error("Cannot encode entry record: {0}")]
    Encode(#[from] serde_json::Error),

    /// Replacing the record with the freshly written temp file failed
    #[error("Cannot replace '{to}' with '{from}': {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Classify a write-side I/O failure on `path`
    pub fn io(path: PathBuf, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            StorageError::PermissionDenied { path, source }
        } else if is_out_of_space(&source) {
            StorageError::QuotaExceeded { path, source }
        } else {
            StorageError::Write { path, source }
        }
    }

    /// What the user can do about it, if anything
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::QuotaExceeded { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } => {
                Some("Check file and directory permissions, or point data_dir somewhere writable.")
            }
            StorageError::Corrupt { .. } => {
                Some("The entries file is damaged. Move it aside to start from the seed entries.")
            }
            StorageError::InvalidImport(_) => {
                Some("Import files must be a JSON array of objects with `text` and `category`.")
            }
            StorageError::Directory { .. } => {
                Some("Check that data_dir points somewhere you can write.")
            }
            _ => None,
        }
    }
}

// ENOSPC, and EDQUOT on Linux
const OUT_OF_SPACE_CODES: &[i32] = &[28, 122];

fn is_out_of_space(error: &io::Error) -> bool {
    if let Some(code) = error.raw_os_error() {
        if OUT_OF_SPACE_CODES.contains(&code) {
            return true;
        }
    }
    let msg = error.to_string().to_lowercase();
    ["no space left", "disk full", "quota exceeded", "not enough space"]
        .iter()
        .any(|needle| msg.contains(needle))
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(kind: io::ErrorKind, msg: &str) -> StorageError {
        StorageError::io(
            PathBuf::from("/data/entries.json"),
            io::Error::new(kind, msg.to_string()),
        )
    }

    #[test]
    fn test_permission_denied() {
        let err = classify(io::ErrorKind::PermissionDenied, "access denied");

        assert!(matches!(err, StorageError::PermissionDenied { .. }));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_quota_exceeded_by_message() {
        let err = classify(io::ErrorKind::Other, "Quota exceeded");

        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_out_of_space_by_os_code() {
        let err = StorageError::io(
            PathBuf::from("/data/entries.json"),
            io::Error::from_raw_os_error(28),
        );
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
    }

    #[test]
    fn test_everything_else_is_write() {
        let err = classify(io::ErrorKind::Other, "something broke");

        assert!(matches!(err, StorageError::Write { .. }));
        assert!(err.recovery_suggestion().is_none());
    }

    #[test]
    fn test_corrupt_message_names_file() {
        let err = StorageError::Corrupt {
            path: PathBuf::from("/data/entries.json"),
            details: "expected value at line 1".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("corrupt"));
        assert!(msg.contains("entries.json"));
        assert!(err.recovery_suggestion().is_some());
    }
}
