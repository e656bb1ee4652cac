//! Remote collection access
//!
//! A `RemoteSource` fetches the current remote snapshot and submits new
//! entries. Implementations normalize whatever the remote returns into the
//! `Entry` shape and hold no entries between calls.
//!
//! - `HttpRemoteSource`: JSON over HTTP
//! - `MemoryRemote`: in-process collection for tests and offline runs

mod http;
mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Entry;

pub use http::HttpRemoteSource;
pub use memory::MemoryRemote;

/// Transport or response failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Request could not be sent or completed
    #[error("Request failed: {0}")]
    Request(String),

    /// Remote did not answer in time
    #[error("Request timed out")]
    Timeout,

    /// Remote answered with a non-success status
    #[error("Remote returned HTTP {0}")]
    Status(u16),

    /// Response body could not be understood
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Remote is not reachable or not configured
    #[error("Remote unavailable: {0}")]
    Unavailable(String),
}

/// Result of one fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteSnapshot {
    /// Normalized entries, at most one page
    pub entries: Vec<Entry>,
    /// Whether the remote holds more records than were taken
    pub has_more: bool,
}

impl RemoteSnapshot {
    /// Snapshot holding every remote record
    pub fn complete(entries: Vec<Entry>) -> Self {
        Self {
            entries,
            has_more: false,
        }
    }
}

/// Access to the remote collection
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch the current remote snapshot
    ///
    /// Every returned entry carries a `remote_id`, with `last_modified` set
    /// to the fetch time.
    async fn fetch_snapshot(&self) -> Result<RemoteSnapshot, NetworkError>;

    /// Create an entry remotely, returning it with its assigned `remote_id`
    async fn submit(&self, entry: &Entry) -> Result<Entry, NetworkError>;
}
