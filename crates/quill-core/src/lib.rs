//! Quill Core Library
//!
//! This crate provides the core functionality for Quill, a small collection
//! of categorized text entries kept in step with a remote collection.
//!
//! # Architecture
//!
//! - **LocalStore**: Durable JSON record, the source of truth on this device
//! - **RemoteSource**: Fetches the remote snapshot and submits new entries
//! - **ReconciliationEngine**: Append-merges remote entries and queues
//!   conflicts for an explicit decision
//! - **SyncScheduler**: Periodic and manual triggers, one cycle at a time
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let store = LocalStore::open(&config);
//! store.add("Stay hungry, stay foolish.", "Inspiration")?;
//!
//! let remote = Arc::new(HttpRemoteSource::from_config(&config)?);
//! let engine = ReconciliationEngine::new(store, remote);
//! let report = engine.run_once().await?;
//!
//! for conflict in engine.pending() {
//!     engine.resolve(&conflict.remote_id, Choice::Remote).await?;
//! }
//! ```
//!
//! # Modules
//!
//! - `store`: Durable entry collection (main entry point)
//! - `models`: The `Entry` type and input validation
//! - `session`: Per-session last-viewed cache
//! - `remote`: Remote collection access
//! - `sync`: Diffing, conflicts, the engine and its scheduler
//! - `storage`: JSON persistence with atomic writes
//! - `config`: Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod remote;
pub mod session;
pub mod storage;
pub mod store;
pub mod sync;

pub use config::Config;
pub use error::{QuillError, QuillResult};
pub use models::{Entry, ValidationError};
pub use remote::{HttpRemoteSource, MemoryRemote, NetworkError, RemoteSnapshot, RemoteSource};
pub use session::SessionCache;
pub use storage::{JsonPersistence, StorageError, StorageResult};
pub use store::LocalStore;
pub use sync::{
    Choice, ConflictRecord, ConflictState, ReconciliationEngine, SchedulerEvent, SyncReport,
    SyncScheduler, SyncStatus, TriggerOutcome, TriggerSource,
};
