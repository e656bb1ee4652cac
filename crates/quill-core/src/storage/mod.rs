//! Storage layer
//!
//! Handles persistence of the durable entry record.
//!
//! ## Architecture
//!
//! - **Record**: one JSON document holding the entries plus sync metadata
//! - **Atomic writes**: temp file, fsync, rename
//!
//! The `LocalStore` in `crate::store` owns the record; `atomic_write` is
//! also used for exports.

pub mod error;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use persistence::{atomic_write, JsonPersistence, StoreRecord};
