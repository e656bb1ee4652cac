//! Reconciliation engine
//!
//! Drives one sync cycle at a time:
//!
//! ```text
//! Idle -> Fetching -> Diffing -> Applying -> Idle
//!            |           |          |
//!            +-----------+----------+--> Failed
//! ```
//!
//! New remote entries are appended to the local store directly. Shared
//! entries whose content differs are queued as conflicts and left untouched
//! until `resolve` is called. A cycle that fails at any step persists
//! nothing and leaves the conflict queue as it was.
//!
//! `resolve`, submission and the Applying step all run under the store
//! lock, so they never interleave.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex as SyncMutex;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::conflict::{Choice, ConflictQueue, ConflictRecord};
use super::diff::{append_new, diff};
use crate::error::{QuillError, QuillResult};
use crate::models::Entry;
use crate::remote::{NetworkError, RemoteSource};
use crate::store::LocalStore;

/// Where the engine is in its cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// No cycle running
    Idle,
    /// Waiting for the remote snapshot
    Fetching,
    /// Comparing the snapshot with local entries
    Diffing,
    /// Persisting the merge
    Applying,
    /// Last cycle failed; no cycle running
    Failed(String),
}

impl SyncStatus {
    /// Whether a cycle is in flight
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SyncStatus::Fetching | SyncStatus::Diffing | SyncStatus::Applying
        )
    }

    /// Short label for displays
    pub fn label(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Fetching => "fetching",
            SyncStatus::Diffing => "diffing",
            SyncStatus::Applying => "applying",
            SyncStatus::Failed(_) => "failed",
        }
    }
}

/// Outcome of a successful cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    /// New remote entries appended locally
    pub merged: usize,
    /// Conflicts newly raised by this cycle
    pub conflicts_raised: usize,
    /// Conflicts pending after this cycle
    pub pending_conflicts: usize,
    /// Shared entries that already matched
    pub unchanged: usize,
    /// Whether the remote had more records than one page
    pub has_more: bool,
    /// When the cycle was recorded as synced
    pub synced_at: DateTime<Utc>,
}

/// Reconciles the local store with a remote source
pub struct ReconciliationEngine {
    store: Mutex<LocalStore>,
    remote: Arc<dyn RemoteSource>,
    conflicts: SyncMutex<ConflictQueue>,
    status_tx: watch::Sender<SyncStatus>,
    status_rx: watch::Receiver<SyncStatus>,
}

impl ReconciliationEngine {
    /// Create an engine owning `store` and talking to `remote`
    pub fn new(store: LocalStore, remote: Arc<dyn RemoteSource>) -> Self {
        let (status_tx, status_rx) = watch::channel(SyncStatus::Idle);
        Self {
            store: Mutex::new(store),
            remote,
            conflicts: SyncMutex::new(ConflictQueue::new()),
            status_tx,
            status_rx,
        }
    }

    /// Current status
    pub fn status(&self) -> SyncStatus {
        self.status_rx.borrow().clone()
    }

    /// Subscribe to status changes
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_rx.clone()
    }

    /// Run one reconciliation cycle
    pub async fn run_once(&self) -> QuillResult<SyncReport> {
        info!("Starting reconciliation cycle");
        let result = self.cycle().await;

        match &result {
            Ok(report) => {
                info!(
                    "Reconciliation complete: merged={} conflicts_raised={} pending={}",
                    report.merged, report.conflicts_raised, report.pending_conflicts
                );
                self.set_status(SyncStatus::Idle);
            }
            Err(e) => {
                warn!("Reconciliation failed: {}", e);
                self.set_status(SyncStatus::Failed(e.to_string()));
            }
        }

        result
    }

    async fn cycle(&self) -> QuillResult<SyncReport> {
        self.set_status(SyncStatus::Fetching);
        let snapshot = self.remote.fetch_snapshot().await?;

        self.set_status(SyncStatus::Diffing);
        let local = self.store.lock().await.load()?;
        let planned = diff(&local, &snapshot.entries);
        debug!(
            "Diff: new={} conflicts={} unchanged={} duplicates={}",
            planned.new_from_remote.len(),
            planned.conflicts.len(),
            planned.unchanged.len(),
            planned.duplicates
        );

        self.set_status(SyncStatus::Applying);
        let store = self.store.lock().await;

        // A resolve may have saved between Diffing and now
        let mut entries = store.load()?;
        let plan = if entries == local {
            planned
        } else {
            debug!("Local entries changed during the cycle, diffing again");
            diff(&entries, &snapshot.entries)
        };

        let merged = append_new(&mut entries, &plan.new_from_remote);
        let synced_at = Utc::now();
        store.save_synced(&entries, synced_at)?;

        let mut queue = self.conflicts.lock();
        for remote_id in &plan.unchanged {
            if queue.discard(remote_id) {
                debug!("Conflict {} no longer diverges, dropped", remote_id);
            }
        }
        let mut conflicts_raised = 0;
        for conflict in plan.conflicts {
            let remote_id = conflict.remote_id.clone();
            if queue.enqueue(conflict) {
                info!("Conflict raised for remote entry {}", remote_id);
                conflicts_raised += 1;
            }
        }

        Ok(SyncReport {
            merged,
            conflicts_raised,
            pending_conflicts: queue.size(),
            unchanged: plan.unchanged.len(),
            has_more: snapshot.has_more,
            synced_at,
        })
    }

    // ==================== Conflicts ====================

    /// Pending conflicts in detection order
    pub fn pending(&self) -> Vec<ConflictRecord> {
        self.conflicts.lock().pending()
    }

    /// Number of pending conflicts
    pub fn pending_count(&self) -> usize {
        self.conflicts.lock().size()
    }

    /// Resolve a pending conflict
    ///
    /// `Local` keeps the local entry and bumps its `last_modified`. `Remote`
    /// overwrites its text, category and `last_modified` with the remote
    /// snapshot. The record leaves the queue only once the outcome is saved.
    /// An unknown `remote_id` reports `NotFound` and changes nothing.
    pub async fn resolve(&self, remote_id: &str, choice: Choice) -> QuillResult<ConflictRecord> {
        let store = self.store.lock().await;

        let record = self
            .conflicts
            .lock()
            .get(remote_id)
            .cloned()
            .ok_or_else(|| QuillError::NotFound {
                remote_id: remote_id.to_string(),
            })?;

        let mut entries = store.load()?;
        let local = entries
            .iter_mut()
            .find(|e| e.remote_id.as_deref() == Some(remote_id));

        match (choice, local) {
            (Choice::Local, Some(entry)) => entry.touch(),
            (Choice::Local, None) => {
                debug!("Local entry for {} is gone, nothing to keep", remote_id);
            }
            (Choice::Remote, Some(entry)) => {
                entry.text = record.remote.text.clone();
                entry.category = record.remote.category.clone();
                entry.last_modified = record.remote.last_modified;
            }
            (Choice::Remote, None) => entries.push(record.remote.clone()),
        }

        store.save(&entries)?;

        let resolved = self
            .conflicts
            .lock()
            .resolve(remote_id, choice)
            .unwrap_or_else(|| ConflictRecord {
                state: choice.resolved_state(),
                ..record
            });

        info!("Resolved conflict {} with {} version", remote_id, choice);
        Ok(resolved)
    }

    /// Resolve every pending conflict the same way
    ///
    /// Returns the number resolved.
    pub async fn resolve_all(&self, choice: Choice) -> QuillResult<usize> {
        let ids: Vec<String> = self
            .pending()
            .into_iter()
            .map(|record| record.remote_id)
            .collect();

        let mut resolved = 0;
        for remote_id in ids {
            match self.resolve(&remote_id, choice).await {
                Ok(_) => resolved += 1,
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(resolved)
    }

    // ==================== Submission ====================

    /// Create a local-only entry on the remote
    ///
    /// On success the local entry gains its `remote_id` and is saved. On a
    /// network failure nothing local changes. The store lock is held across
    /// the request, so a cycle cannot merge the freshly created record as a
    /// separate entry. If the remote hands back an ID that another local
    /// entry already carries, the entry stays local-only and
    /// `RemoteIdConflict` is returned.
    pub async fn submit_entry(&self, local_id: &str) -> QuillResult<Entry> {
        let store = self.store.lock().await;

        let entry = store
            .get(local_id)?
            .ok_or_else(|| QuillError::EntryNotFound {
                local_id: local_id.to_string(),
            })?;

        if let Some(remote_id) = entry.remote_id {
            return Err(QuillError::AlreadySubmitted {
                local_id: local_id.to_string(),
                remote_id,
            });
        }

        let submitted = self.remote.submit(&entry).await?;
        let remote_id = submitted
            .remote_id
            .clone()
            .ok_or_else(|| NetworkError::Malformed("submission returned no id".to_string()))?;

        let mut entries = store.load()?;
        if let Some(holder) = entries
            .iter()
            .find(|e| e.local_id != local_id && e.remote_id.as_deref() == Some(remote_id.as_str()))
        {
            warn!(
                "Remote id {} for entry {} is already used by entry {}",
                remote_id, local_id, holder.local_id
            );
            return Err(QuillError::RemoteIdConflict {
                local_id: local_id.to_string(),
                remote_id,
                holder: holder.local_id.clone(),
            });
        }

        match entries.iter_mut().find(|e| e.local_id == local_id) {
            Some(existing) => {
                existing.remote_id = Some(remote_id.clone());
                store.save(&entries)?;
                info!("Entry {} is now remote entry {}", local_id, remote_id);
            }
            None => warn!("Entry {} was removed while submitting", local_id),
        }

        Ok(submitted)
    }

    /// Submit every local-only entry
    ///
    /// Stops at the first failure; entries submitted before it stay saved.
    /// Returns the number submitted.
    pub async fn submit_pending(&self) -> QuillResult<usize> {
        let local_only: Vec<String> = self
            .store
            .lock()
            .await
            .load()?
            .into_iter()
            .filter(Entry::is_local_only)
            .map(|e| e.local_id)
            .collect();

        let mut submitted = 0;
        for local_id in local_only {
            match self.submit_entry(&local_id).await {
                Ok(_) => submitted += 1,
                Err(QuillError::AlreadySubmitted { .. } | QuillError::EntryNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(submitted)
    }

    // ==================== Reads ====================

    /// Current local entries
    pub async fn entries(&self) -> QuillResult<Vec<Entry>> {
        Ok(self.store.lock().await.load()?)
    }

    /// When the last cycle completed
    pub async fn last_sync(&self) -> QuillResult<Option<DateTime<Utc>>> {
        Ok(self.store.lock().await.last_sync()?)
    }

    fn set_status(&self, status: SyncStatus) {
        debug!("Sync status -> {}", status.label());
        let _ = self.status_tx.send(status);
    }
}
