//! Reconciliation with the remote collection
//!
//! A cycle fetches the remote snapshot, diffs it against the local
//! collection, appends entries the device has never seen, and queues a
//! conflict for every shared entry whose content differs. Conflicts wait for
//! an explicit choice.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = Arc::new(ReconciliationEngine::new(store, remote));
//! let (scheduler, events) = SyncScheduler::new(engine.clone());
//! let handle = scheduler.spawn(config.sync_interval());
//! ```

pub mod conflict;
pub mod diff;
pub mod engine;
pub mod scheduler;

pub use conflict::{Choice, ConflictQueue, ConflictRecord, ConflictState};
pub use diff::{append_new, diff, Diff};
pub use engine::{ReconciliationEngine, SyncReport, SyncStatus};
pub use scheduler::{
    SchedulerEvent, SchedulerHandle, SyncScheduler, TriggerOutcome, TriggerSource,
};
