//! Snapshot diffing
//!
//! Pure comparison of the local collection against a remote snapshot.
//! Identity is the `remote_id`: two entries sharing one are the same entry,
//! and differing text or category between them is a conflict. Local-only
//! entries never take part.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use super::conflict::ConflictRecord;
use crate::models::Entry;

/// Outcome of comparing local entries with a snapshot
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Diff {
    /// Remote entries with no local counterpart
    pub new_from_remote: Vec<Entry>,
    /// Shared entries whose content differs
    pub conflicts: Vec<ConflictRecord>,
    /// Remote IDs of shared entries with identical content
    pub unchanged: Vec<String>,
    /// Snapshot entries skipped because their `remote_id` repeated
    pub duplicates: usize,
}

impl Diff {
    /// Whether applying this diff would change nothing
    pub fn is_empty(&self) -> bool {
        self.new_from_remote.is_empty() && self.conflicts.is_empty()
    }
}

/// Compare `local` against `remote`
///
/// Within the snapshot, the first entry for a `remote_id` wins.
pub fn diff(local: &[Entry], remote: &[Entry]) -> Diff {
    let mut index: HashMap<&str, &Entry> = HashMap::new();
    for entry in local {
        if let Some(ref remote_id) = entry.remote_id {
            index.entry(remote_id.as_str()).or_insert(entry);
        }
    }

    let mut result = Diff::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for remote_entry in remote {
        let Some(ref remote_id) = remote_entry.remote_id else {
            warn!("Ignoring snapshot entry without a remote id");
            continue;
        };
        if !seen.insert(remote_id.as_str()) {
            result.duplicates += 1;
            continue;
        }

        match index.get(remote_id.as_str()) {
            None => result.new_from_remote.push(remote_entry.clone()),
            Some(local_entry) if local_entry.same_content(remote_entry) => {
                result.unchanged.push(remote_id.clone());
            }
            Some(local_entry) => result.conflicts.push(ConflictRecord::new(
                remote_id.clone(),
                (*local_entry).clone(),
                remote_entry.clone(),
            )),
        }
    }

    result
}

/// Append remote entries whose `remote_id` is not yet present
///
/// Returns the number appended.
pub fn append_new(local: &mut Vec<Entry>, incoming: &[Entry]) -> usize {
    let mut present: HashSet<String> = local
        .iter()
        .filter_map(|e| e.remote_id.clone())
        .collect();

    let mut appended = 0;
    for entry in incoming {
        let Some(ref remote_id) = entry.remote_id else {
            continue;
        };
        if present.insert(remote_id.clone()) {
            local.push(entry.clone());
            appended += 1;
        }
    }
    appended
}
