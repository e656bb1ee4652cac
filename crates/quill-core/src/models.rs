//! Data models for Quill
//!
//! Defines the unit being synchronized: an `Entry` (a short text with a
//! category). Entries carry two identities: a `local_id` assigned when the
//! entry is created on this device, and an optional `remote_id` assigned by
//! the remote collection once the entry has been submitted or fetched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Rejected user input
///
/// Raised before any state change when text or category is blank.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Text is empty after trimming
    #[error("Entry text cannot be empty")]
    EmptyText,
    /// Category is empty after trimming
    #[error("Entry category cannot be empty")]
    EmptyCategory,
}

/// A single user-visible record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    /// Device-local identifier, never reused
    pub local_id: String,
    /// Identifier in the remote collection, if associated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    /// Entry text
    pub text: String,
    /// Entry category
    pub category: String,
    /// When text or category last changed
    pub last_modified: DateTime<Utc>,
}

impl Entry {
    /// Create a new local-only entry
    ///
    /// Text and category are trimmed; blank values are rejected.
    pub fn new(
        text: impl AsRef<str>,
        category: impl AsRef<str>,
    ) -> Result<Self, ValidationError> {
        let (text, category) = validate(text.as_ref(), category.as_ref())?;
        Ok(Self {
            local_id: new_local_id(),
            remote_id: None,
            text,
            category,
            last_modified: Utc::now(),
        })
    }

    /// Create an entry that mirrors a record of the remote collection
    ///
    /// `last_modified` is set to `fetched_at`.
    pub fn from_remote(
        remote_id: impl Into<String>,
        text: impl AsRef<str>,
        category: impl AsRef<str>,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let (text, category) = validate(text.as_ref(), category.as_ref())?;
        Ok(Self {
            local_id: new_local_id(),
            remote_id: Some(remote_id.into()),
            text,
            category,
            last_modified: fetched_at,
        })
    }

    /// Whether this entry has never been associated with a remote record
    pub fn is_local_only(&self) -> bool {
        self.remote_id.is_none()
    }

    /// Whether text and category match another entry
    pub fn same_content(&self, other: &Entry) -> bool {
        self.text == other.text && self.category == other.category
    }

    /// Replace text and category, bumping `last_modified`
    pub fn set_content(
        &mut self,
        text: impl AsRef<str>,
        category: impl AsRef<str>,
    ) -> Result<(), ValidationError> {
        let (text, category) = validate(text.as_ref(), category.as_ref())?;
        self.text = text;
        self.category = category;
        self.touch();
        Ok(())
    }

    /// Bump `last_modified` to now
    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }
}

/// Trim and check text/category
pub fn validate(text: &str, category: &str) -> Result<(String, String), ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyText);
    }
    let category = category.trim();
    if category.is_empty() {
        return Err(ValidationError::EmptyCategory);
    }
    Ok((text.to_string(), category.to_string()))
}

fn new_local_id() -> String {
    Uuid::new_v4().to_string()
}
