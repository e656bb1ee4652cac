//! Per-session state
//!
//! Holds the last-viewed entry for the lifetime of one process. Nothing here
//! is persisted; the record is gone when the session ends.

use rand::seq::SliceRandom;

use crate::models::Entry;

/// Ephemeral session record
#[derive(Debug, Default)]
pub struct SessionCache {
    last_viewed: Option<Entry>,
}

impl SessionCache {
    /// Start an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the entry the user is looking at
    pub fn set_last_viewed(&mut self, entry: Entry) {
        self.last_viewed = Some(entry);
    }

    /// The entry last shown, if any
    pub fn last_viewed(&self) -> Option<&Entry> {
        self.last_viewed.as_ref()
    }

    /// Forget the last-viewed entry
    pub fn clear(&mut self) {
        self.last_viewed = None;
    }

    /// Pick a random entry and remember it as last viewed
    ///
    /// Returns `None` for an empty collection, leaving the cache untouched.
    pub fn random_entry(&mut self, entries: &[Entry]) -> Option<Entry> {
        let entry = entries.choose(&mut rand::thread_rng())?.clone();
        self.set_last_viewed(entry.clone());
        Some(entry)
    }
}
