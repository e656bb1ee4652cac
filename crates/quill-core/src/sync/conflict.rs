//! Conflict queue
//!
//! Holds divergences found during reconciliation until the user (or an
//! automatic policy) picks a side. Records are kept in detection order and
//! live only for the session; the next cycle re-detects anything left
//! unresolved.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::Entry;

/// Lifecycle of a conflict record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictState {
    /// Waiting for a decision
    Pending,
    /// The local version was kept
    ResolvedLocal,
    /// The remote version was taken
    ResolvedRemote,
}

/// Which side wins a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    /// Keep the local entry as-is
    Local,
    /// Overwrite the local entry with the remote snapshot
    Remote,
}

impl Choice {
    /// State a record moves to when resolved with this choice
    pub fn resolved_state(self) -> ConflictState {
        match self {
            Choice::Local => ConflictState::ResolvedLocal,
            Choice::Remote => ConflictState::ResolvedRemote,
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::Local => write!(f, "local"),
            Choice::Remote => write!(f, "remote"),
        }
    }
}

impl FromStr for Choice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "l" => Ok(Choice::Local),
            "remote" | "r" => Ok(Choice::Remote),
            other => Err(format!("expected 'local' or 'remote', got '{}'", other)),
        }
    }
}

/// A local/remote pair sharing a `remote_id` but differing in content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Shared identity key
    pub remote_id: String,
    /// Local entry at detection time
    pub local: Entry,
    /// Remote entry at fetch time
    pub remote: Entry,
    /// Current state
    pub state: ConflictState,
}

impl ConflictRecord {
    /// Create a pending record
    pub fn new(remote_id: impl Into<String>, local: Entry, remote: Entry) -> Self {
        Self {
            remote_id: remote_id.into(),
            local,
            remote,
            state: ConflictState::Pending,
        }
    }
}

/// Ordered collection of pending conflicts
#[derive(Debug, Default)]
pub struct ConflictQueue {
    records: Vec<ConflictRecord>,
}

impl ConflictQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending records in detection order
    pub fn pending(&self) -> Vec<ConflictRecord> {
        self.records.clone()
    }

    /// Look up a pending record
    pub fn get(&self, remote_id: &str) -> Option<&ConflictRecord> {
        self.records.iter().find(|r| r.remote_id == remote_id)
    }

    /// Add a record, or refresh the one already pending for its `remote_id`
    ///
    /// A refreshed record keeps its queue position. Returns `true` when the
    /// record is new.
    pub fn enqueue(&mut self, mut record: ConflictRecord) -> bool {
        record.state = ConflictState::Pending;
        match self
            .records
            .iter_mut()
            .find(|r| r.remote_id == record.remote_id)
        {
            Some(existing) => {
                *existing = record;
                false
            }
            None => {
                self.records.push(record);
                true
            }
        }
    }

    /// Move a record out of `Pending` and remove it
    ///
    /// Returns the record in its resolved state, or `None` if nothing is
    /// pending for `remote_id`.
    pub fn resolve(&mut self, remote_id: &str, choice: Choice) -> Option<ConflictRecord> {
        let position = self.records.iter().position(|r| r.remote_id == remote_id)?;
        let mut record = self.records.remove(position);
        record.state = choice.resolved_state();
        Some(record)
    }

    /// Drop a pending record without resolving it
    pub fn discard(&mut self, remote_id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.remote_id != remote_id);
        self.records.len() != before
    }

    /// Number of pending records
    pub fn size(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn conflict(remote_id: &str, local_text: &str, remote_text: &str) -> ConflictRecord {
        let mut local = Entry::new(local_text, "X").unwrap();
        local.remote_id = Some(remote_id.to_string());
        let remote = Entry::from_remote(remote_id, remote_text, "X", Utc::now()).unwrap();
        ConflictRecord::new(remote_id, local, remote)
    }

    #[test]
    fn test_enqueue_preserves_detection_order() {
        let mut queue = ConflictQueue::new();
        assert!(queue.enqueue(conflict("3", "a", "b")));
        assert!(queue.enqueue(conflict("1", "a", "b")));
        assert!(queue.enqueue(conflict("2", "a", "b")));

        let ids: Vec<_> = queue.pending().into_iter().map(|r| r.remote_id).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
        assert!(queue
            .pending()
            .iter()
            .all(|r| r.state == ConflictState::Pending));
    }

    #[test]
    fn test_enqueue_same_remote_id_refreshes() {
        let mut queue = ConflictQueue::new();
        queue.enqueue(conflict("1", "a", "b"));
        queue.enqueue(conflict("2", "a", "b"));
        assert!(!queue.enqueue(conflict("1", "a", "c")));

        assert_eq!(queue.size(), 2);
        assert_eq!(queue.pending()[0].remote_id, "1");
        assert_eq!(queue.get("1").unwrap().remote.text, "c");
    }

    #[test]
    fn test_resolve_removes_and_sets_state() {
        let mut queue = ConflictQueue::new();
        queue.enqueue(conflict("1", "a", "b"));
        queue.enqueue(conflict("2", "a", "b"));

        let resolved = queue.resolve("1", Choice::Remote).unwrap();
        assert_eq!(resolved.state, ConflictState::ResolvedRemote);
        assert_eq!(queue.size(), 1);

        let resolved = queue.resolve("2", Choice::Local).unwrap();
        assert_eq!(resolved.state, ConflictState::ResolvedLocal);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_resolve_missing_is_none() {
        let mut queue = ConflictQueue::new();
        queue.enqueue(conflict("1", "a", "b"));

        assert!(queue.resolve("9", Choice::Local).is_none());
        assert!(queue.resolve("1", Choice::Local).is_some());
        // Second resolve of the same id (double click) finds nothing
        assert!(queue.resolve("1", Choice::Local).is_none());
        assert_eq!(queue.size(), 0);
    }

    #[test]
    fn test_discard() {
        let mut queue = ConflictQueue::new();
        queue.enqueue(conflict("1", "a", "b"));
        queue.enqueue(conflict("2", "a", "b"));

        assert!(queue.discard("1"));
        assert!(!queue.discard("1"));
        assert_eq!(queue.size(), 1);
        assert!(queue.discard("2"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_choice_parse() {
        assert_eq!("Remote".parse::<Choice>().unwrap(), Choice::Remote);
        assert_eq!("l".parse::<Choice>().unwrap(), Choice::Local);
        assert!("both".parse::<Choice>().is_err());
        assert_eq!(Choice::Local.to_string(), "local");
    }
}
