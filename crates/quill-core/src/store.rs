//! Local entry store
//!
//! The `LocalStore` owns the durable entry collection and the sync
//! metadata that travels with it (last sync time, last save time,
//! last-applied category filter).
//!
//! ## Seeding
//!
//! The first-ever `load()` finds no record on disk, writes the seed entries
//! and returns them. Later loads never re-seed, even if the collection was
//! emptied.
//!
//! ## Usage
//!
//! ```ignore
//! let store = LocalStore::open(&config);
//! let entries = store.load()?;
//! store.add("Stay hungry, stay foolish.", "Inspiration")?;
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::QuillResult;
use crate::models::{validate, Entry};
use crate::storage::{JsonPersistence, StorageError, StorageResult, StoreRecord};

/// Entries written on first-ever load
const SEED_ENTRIES: &[(&str, &str)] = &[
    ("Be the change you wish to see in the world.", "Inspiration"),
    ("The only way to do great work is to love what you do.", "Work"),
];

/// Durable entry collection
pub struct LocalStore {
    persistence: JsonPersistence,
}

impl LocalStore {
    /// Open the store described by the configuration
    pub fn open(config: &Config) -> Self {
        Self::with_persistence(JsonPersistence::new(config.store_path()))
    }

    /// Open a store on an explicit persistence handler
    pub fn with_persistence(persistence: JsonPersistence) -> Self {
        Self { persistence }
    }

    /// Get the persistence handler
    pub fn persistence(&self) -> &JsonPersistence {
        &self.persistence
    }

    /// Load the collection, seeding it on first-ever use
    pub fn load(&self) -> StorageResult<Vec<Entry>> {
        Ok(self.record()?.entries)
    }

    /// Replace the persisted collection
    ///
    /// Also records the current time as "last saved at". Saving before the
    /// first load writes `entries` as they are, without seeding.
    pub fn save(&self, entries: &[Entry]) -> StorageResult<()> {
        let mut record = self.stored()?;
        record.entries = entries.to_vec();
        record.last_saved_at = Some(Utc::now());
        self.persistence.save(&record)
    }

    /// Replace the collection and record a sync time in one atomic write
    pub fn save_synced(&self, entries: &[Entry], synced_at: DateTime<Utc>) -> StorageResult<()> {
        let mut record = self.stored()?;
        record.entries = entries.to_vec();
        record.last_saved_at = Some(Utc::now());
        record.last_sync = Some(synced_at);
        self.persistence.save(&record)
    }

    /// Record when the last reconciliation cycle completed
    pub fn record_last_sync(&self, timestamp: DateTime<Utc>) -> StorageResult<()> {
        let mut record = self.record()?;
        record.last_sync = Some(timestamp);
        self.persistence.save(&record)
    }

    /// When the last reconciliation cycle completed
    pub fn last_sync(&self) -> StorageResult<Option<DateTime<Utc>>> {
        Ok(self.record()?.last_sync)
    }

    /// When the collection was last saved
    pub fn last_saved_at(&self) -> StorageResult<Option<DateTime<Utc>>> {
        Ok(self.record()?.last_saved_at)
    }

    /// Remember the last-applied category filter (`None` means all)
    pub fn record_filter(&self, category: Option<&str>) -> StorageResult<()> {
        let mut record = self.record()?;
        record.last_filter = category
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
            .map(str::to_string);
        self.persistence.save(&record)
    }

    /// The last-applied category filter
    pub fn last_filter(&self) -> StorageResult<Option<String>> {
        Ok(self.record()?.last_filter)
    }

    // ==================== Entry Operations ====================

    /// Create a local-only entry and persist it
    ///
    /// Blank text or category is rejected before anything is written.
    pub fn add(&self, text: &str, category: &str) -> QuillResult<Entry> {
        let entry = Entry::new(text, category)?;
        let mut entries = self.load()?;
        entries.push(entry.clone());
        self.save(&entries)?;
        info!("Added entry {}", entry.local_id);
        Ok(entry)
    }

    /// Get an entry by local ID
    pub fn get(&self, local_id: &str) -> StorageResult<Option<Entry>> {
        Ok(self
            .load()?
            .into_iter()
            .find(|e| e.local_id == local_id))
    }

    /// Get entries in a category (all entries when `None`)
    pub fn filter(&self, category: Option<&str>) -> StorageResult<Vec<Entry>> {
        let entries = self.load()?;
        Ok(match category {
            Some(category) => entries
                .into_iter()
                .filter(|e| e.category == category)
                .collect(),
            None => entries,
        })
    }

    /// Sorted list of distinct categories
    pub fn categories(&self) -> StorageResult<Vec<String>> {
        let categories: BTreeSet<String> =
            self.load()?.into_iter().map(|e| e.category).collect();
        Ok(categories.into_iter().collect())
    }

    /// Number of entries
    pub fn count(&self) -> StorageResult<usize> {
        Ok(self.load()?.len())
    }

    // ==================== Import / Export ====================

    /// Import entries from a JSON array of `{text, category}` objects
    ///
    /// Every record is validated before anything is written. Records equal
    /// in text and category to an existing entry are skipped. Returns the
    /// number of entries added.
    pub fn import_json(&self, json: &str) -> StorageResult<usize> {
        let records: Vec<TransferRecord> = serde_json::from_str(json)
            .map_err(|e| StorageError::InvalidImport(e.to_string()))?;

        let mut incoming = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let (text, category) = validate(&record.text, &record.category)
                .map_err(|e| StorageError::InvalidImport(format!("record {}: {}", index, e)))?;
            incoming.push((text, category));
        }

        let mut entries = self.load()?;
        let mut added = 0;
        for (text, category) in incoming {
            let exists = entries
                .iter()
                .any(|e| e.text == text && e.category == category);
            if exists {
                continue;
            }
            // validated above
            if let Ok(entry) = Entry::new(&text, &category) {
                entries.push(entry);
                added += 1;
            }
        }

        if added > 0 {
            self.save(&entries)?;
        }
        info!("Imported {} new entries", added);
        Ok(added)
    }

    /// Export all entries as a pretty JSON array of `{text, category}`
    pub fn export_json(&self) -> StorageResult<String> {
        let records: Vec<TransferRecord> = self
            .load()?
            .into_iter()
            .map(|e| TransferRecord {
                text: e.text,
                category: e.category,
            })
            .collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Read the full record as it is on disk, empty when there is none
    fn stored(&self) -> StorageResult<StoreRecord> {
        Ok(self.persistence.load()?.unwrap_or_default())
    }

    /// Read the full record, seeding on first-ever use
    fn record(&self) -> StorageResult<StoreRecord> {
        if let Some(record) = self.persistence.load()? {
            return Ok(record);
        }

        debug!("No entry record found, writing seed entries");
        let now = Utc::now();
        let entries = SEED_ENTRIES
            .iter()
            .filter_map(|(text, category)| Entry::new(text, category).ok())
            .collect();
        let record = StoreRecord {
            entries,
            last_sync: None,
            last_saved_at: Some(now),
            last_filter: None,
        };
        self.persistence.save(&record)?;
        Ok(record)
    }
}

/// Import/export shape
#[derive(Debug, Serialize, Deserialize)]
struct TransferRecord {
    text: String,
    category: String,
}
