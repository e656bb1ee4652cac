//! In-process remote collection
//!
//! Holds remote records in memory. Used by tests and offline runs, with
//! knobs for injecting failures and for holding a fetch open until released.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{NetworkError, RemoteSnapshot, RemoteSource};
use crate::models::Entry;

/// A remote record held by `MemoryRemote`
#[derive(Debug, Clone, PartialEq, Eq)]
struct MemoryRecord {
    id: String,
    text: String,
    category: String,
}

/// In-memory `RemoteSource`
#[derive(Default)]
pub struct MemoryRemote {
    records: Mutex<Vec<MemoryRecord>>,
    fail_with: Mutex<Option<NetworkError>>,
    gate: Mutex<Option<Arc<Notify>>>,
    submit_gate: Mutex<Option<Arc<Notify>>>,
    fetches: AtomicUsize,
    submits: AtomicUsize,
    next_id: AtomicU64,
}

impl MemoryRemote {
    /// Create an empty remote
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a remote record
    pub fn put(&self, id: impl Into<String>, text: impl Into<String>, category: impl Into<String>) {
        let record = MemoryRecord {
            id: id.into(),
            text: text.into(),
            category: category.into(),
        };
        let mut records = self.records.lock();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// Remove a remote record
    pub fn remove(&self, id: &str) {
        self.records.lock().retain(|r| r.id != id);
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether the remote holds no records
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Make every following call fail with `error`
    pub fn fail_with(&self, error: NetworkError) {
        *self.fail_with.lock() = Some(error);
    }

    /// Stop injecting failures
    pub fn recover(&self) {
        *self.fail_with.lock() = None;
    }

    /// Hold fetches open until the returned handle is notified
    pub fn hold_fetches(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock() = Some(notify.clone());
        notify
    }

    /// Stop holding fetches
    pub fn release_fetches(&self) {
        if let Some(gate) = self.gate.lock().take() {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    /// Hold submit responses until released
    ///
    /// The record is created before the response is held, the way a slow
    /// reply from a real remote looks.
    pub fn hold_submits(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.submit_gate.lock() = Some(notify.clone());
        notify
    }

    /// Stop holding submit responses
    pub fn release_submits(&self) {
        if let Some(gate) = self.submit_gate.lock().take() {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    /// Number of fetches started
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of successful submissions
    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    fn injected_failure(&self) -> Result<(), NetworkError> {
        match self.fail_with.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteSource for MemoryRemote {
    async fn fetch_snapshot(&self) -> Result<RemoteSnapshot, NetworkError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.injected_failure()?;

        let fetched_at = Utc::now();
        let records = self.records.lock().clone();
        let entries = records
            .into_iter()
            .filter_map(|r| Entry::from_remote(r.id, r.text, r.category, fetched_at).ok())
            .collect();
        Ok(RemoteSnapshot::complete(entries))
    }

    async fn submit(&self, entry: &Entry) -> Result<Entry, NetworkError> {
        self.injected_failure()?;

        let id = loop {
            let candidate = format!("m{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
            if !self.records.lock().iter().any(|r| r.id == candidate) {
                break candidate;
            }
        };
        self.put(&id, &entry.text, &entry.category);
        self.submits.fetch_add(1, Ordering::SeqCst);

        let gate = self.submit_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut submitted = entry.clone();
        submitted.remote_id = Some(id);
        Ok(submitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_returns_records() {
        let remote = MemoryRemote::new();
        remote.put("5", "A", "X");
        remote.put("6", "B", "Y");

        let snapshot = remote.fetch_snapshot().await.unwrap();
        assert_eq!(snapshot.entries.len(), 2);
        assert_eq!(snapshot.entries[0].remote_id.as_deref(), Some("5"));
        assert!(!snapshot.has_more);
        assert_eq!(remote.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let remote = MemoryRemote::new();
        remote.put("5", "A", "X");
        remote.put("5", "B", "X");

        assert_eq!(remote.len(), 1);
        let snapshot = remote.fetch_snapshot().await.unwrap();
        assert_eq!(snapshot.entries[0].text, "B");
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let remote = MemoryRemote::new();
        remote.fail_with(NetworkError::Timeout);

        assert_eq!(
            remote.fetch_snapshot().await.unwrap_err(),
            NetworkError::Timeout
        );
        let entry = Entry::new("A", "X").unwrap();
        assert!(remote.submit(&entry).await.is_err());
        assert!(remote.is_empty());

        remote.recover();
        assert!(remote.fetch_snapshot().await.is_ok());
    }

    #[tokio::test]
    async fn test_submit_assigns_id() {
        let remote = MemoryRemote::new();
        let entry = Entry::new("A", "X").unwrap();

        let submitted = remote.submit(&entry).await.unwrap();
        assert_eq!(submitted.local_id, entry.local_id);
        assert!(submitted.remote_id.is_some());
        assert_eq!(remote.len(), 1);
        assert_eq!(remote.submit_count(), 1);
    }

    #[tokio::test]
    async fn test_hold_and_release_fetch() {
        let remote = Arc::new(MemoryRemote::new());
        let _gate = remote.hold_fetches();

        let task = {
            let remote = remote.clone();
            tokio::spawn(async move { remote.fetch_snapshot().await })
        };

        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        remote.release_fetches();
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_held_submit_creates_record_first() {
        let remote = Arc::new(MemoryRemote::new());
        let _gate = remote.hold_submits();

        let task = {
            let remote = remote.clone();
            tokio::spawn(async move {
                let entry = Entry::new("A", "X").unwrap();
                remote.submit(&entry).await
            })
        };

        tokio::task::yield_now().await;
        assert!(!task.is_finished());
        assert_eq!(remote.len(), 1);

        remote.release_submits();
        assert!(task.await.unwrap().is_ok());
    }
}
