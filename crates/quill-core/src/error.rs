//! Error taxonomy
//!
//! Every fallible public operation returns a `QuillError`. None of the
//! variants is fatal: each failing operation leaves state as it was before
//! the call, so the next scheduled or manual trigger can retry.

use thiserror::Error;

use crate::models::ValidationError;
use crate::remote::NetworkError;
use crate::storage::StorageError;

/// Errors surfaced by stores, remotes and the reconciliation engine
#[derive(Error, Debug)]
pub enum QuillError {
    /// Blank text or category, rejected before any state change
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Persistence layer failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Fetch or submit failure
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// No pending conflict for this remote ID
    #[error("No pending conflict for remote entry '{remote_id}'")]
    NotFound { remote_id: String },

    /// No local entry with this local ID
    #[error("No entry with local ID '{local_id}'")]
    EntryNotFound { local_id: String },

    /// Entry is already associated with a remote record
    #[error("Entry '{local_id}' was already submitted as remote entry '{remote_id}'")]
    AlreadySubmitted { local_id: String, remote_id: String },

    /// The remote handed out an ID another local entry already carries
    #[error("Remote assigned '{remote_id}' to entry '{local_id}', but entry '{holder}' already has it")]
    RemoteIdConflict {
        local_id: String,
        remote_id: String,
        holder: String,
    },
}

impl QuillError {
    /// Whether this is the "nothing to resolve" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, QuillError::NotFound { .. })
    }

    /// Short label for status displays
    pub fn kind(&self) -> &'static str {
        match self {
            QuillError::Validation(_) => "validation",
            QuillError::Storage(_) => "storage",
            QuillError::Network(_) => "network",
            QuillError::NotFound { .. } => "not-found",
            QuillError::EntryNotFound { .. } => "entry-not-found",
            QuillError::AlreadySubmitted { .. } => "already-submitted",
            QuillError::RemoteIdConflict { .. } => "remote-id-conflict",
        }
    }
}

/// Result type for Quill operations
pub type QuillResult<T> = Result<T, QuillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_passes_through() {
        let err = QuillError::from(ValidationError::EmptyText);
        assert_eq!(err.to_string(), "Entry text cannot be empty");
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_not_found() {
        let err = QuillError::NotFound {
            remote_id: "5".to_string(),
        };
        assert!(err.is_not_found());
        assert!(err.to_string().contains("'5'"));
    }

    #[test]
    fn test_network_kind() {
        let err = QuillError::from(NetworkError::Timeout);
        assert_eq!(err.kind(), "network");
        assert!(!err.is_not_found());
    }
}
