//! Sync scheduling
//!
//! Triggers reconciliation on a fixed period and on request. At most one
//! cycle is in flight: a trigger that arrives while a cycle is running is
//! dropped, not queued, so the next tick always starts from fresh data.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::engine::{ReconciliationEngine, SyncReport};
use crate::error::QuillResult;

/// What asked for a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// The periodic timer
    Timer,
    /// An explicit user request
    Manual,
}

/// Whether a trigger started a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A new cycle was started
    Started,
    /// A cycle was already in flight; the trigger was dropped
    Dropped,
}

/// Events from the scheduler
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A cycle completed
    CycleFinished(SyncReport),
    /// A cycle failed
    CycleFailed(String),
    /// A trigger arrived while a cycle was in flight
    TriggerDropped(TriggerSource),
}

/// Commands sent to the scheduler task
#[derive(Debug)]
enum SchedulerCommand {
    /// Run a cycle now
    Trigger,
    /// Stop the scheduler task
    Shutdown,
}

/// Clears the in-flight flag when a cycle ends, however it ends
struct FlightGuard(Arc<AtomicBool>);

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Single-flight trigger for the reconciliation engine
#[derive(Clone)]
pub struct SyncScheduler {
    engine: Arc<ReconciliationEngine>,
    in_flight: Arc<AtomicBool>,
    event_tx: mpsc::UnboundedSender<SchedulerEvent>,
}

impl SyncScheduler {
    /// Create a scheduler and the receiver for its events
    pub fn new(
        engine: Arc<ReconciliationEngine>,
    ) -> (Self, mpsc::UnboundedReceiver<SchedulerEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            engine,
            in_flight: Arc::new(AtomicBool::new(false)),
            event_tx,
        };
        (scheduler, event_rx)
    }

    /// The engine being driven
    pub fn engine(&self) -> &Arc<ReconciliationEngine> {
        &self.engine
    }

    /// Whether a cycle is running
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Start a cycle in the background unless one is in flight
    pub fn trigger(&self, source: TriggerSource) -> TriggerOutcome {
        let Some(guard) = self.try_begin(source) else {
            return TriggerOutcome::Dropped;
        };

        let engine = self.engine.clone();
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            let _guard = guard;
            let result = engine.run_once().await;
            emit_result(&event_tx, &result);
        });

        TriggerOutcome::Started
    }

    /// Run a cycle to completion unless one is in flight
    ///
    /// Returns `None` when the trigger was dropped.
    pub async fn run_now(&self, source: TriggerSource) -> Option<QuillResult<SyncReport>> {
        let _guard = self.try_begin(source)?;
        let result = self.engine.run_once().await;
        emit_result(&self.event_tx, &result);
        Some(result)
    }

    /// Spawn the periodic loop
    ///
    /// Ticks every `interval`; the returned handle sends manual triggers and
    /// stops the loop.
    pub fn spawn(self, interval: Duration) -> SchedulerHandle {
        let (command_tx, command_rx) = mpsc::channel(16);
        let task = tokio::spawn(scheduler_task(self, interval, command_rx));
        SchedulerHandle { command_tx, task }
    }

    fn try_begin(&self, source: TriggerSource) -> Option<FlightGuard> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Sync already in flight, dropping {:?} trigger", source);
            let _ = self.event_tx.send(SchedulerEvent::TriggerDropped(source));
            return None;
        }
        debug!("Sync triggered by {:?}", source);
        Some(FlightGuard(self.in_flight.clone()))
    }
}

fn emit_result(
    event_tx: &mpsc::UnboundedSender<SchedulerEvent>,
    result: &QuillResult<SyncReport>,
) {
    let event = match result {
        Ok(report) => SchedulerEvent::CycleFinished(report.clone()),
        Err(e) => SchedulerEvent::CycleFailed(e.to_string()),
    };
    let _ = event_tx.send(event);
}

/// Background loop: tick on the interval, obey commands
async fn scheduler_task(
    scheduler: SyncScheduler,
    interval: Duration,
    mut command_rx: mpsc::Receiver<SchedulerCommand>,
) {
    info!("Sync scheduler started, interval {:?}", interval);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                scheduler.trigger(TriggerSource::Timer);
            }
            cmd = command_rx.recv() => {
                match cmd {
                    Some(SchedulerCommand::Trigger) => {
                        scheduler.trigger(TriggerSource::Manual);
                    }
                    Some(SchedulerCommand::Shutdown) | None => break,
                }
            }
        }
    }

    info!("Sync scheduler stopped");
}

/// Handle for controlling a spawned scheduler
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Ask for a cycle now
    pub async fn trigger(&self) {
        if self.command_tx.send(SchedulerCommand::Trigger).await.is_err() {
            warn!("Sync scheduler is not running");
        }
    }

    /// Stop the periodic loop and wait for it to exit
    ///
    /// A cycle already in flight finishes on its own.
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(SchedulerCommand::Shutdown).await;
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryRemote;
    use crate::storage::JsonPersistence;
    use crate::store::LocalStore;
    use crate::sync::engine::SyncStatus;
    use tempfile::TempDir;
    use tokio::time::timeout;

    fn engine_with(remote: Arc<MemoryRemote>, temp_dir: &TempDir) -> Arc<ReconciliationEngine> {
        let store =
            LocalStore::with_persistence(JsonPersistence::new(temp_dir.path().join("entries.json")));
        Arc::new(ReconciliationEngine::new(store, remote))
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<SchedulerEvent>) -> SchedulerEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for scheduler event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn test_back_to_back_triggers_run_one_cycle() {
        let temp_dir = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        remote.put("9", "Nine", "Y");
        let _gate = remote.hold_fetches();
        let engine = engine_with(remote.clone(), &temp_dir);
        let (scheduler, mut events) = SyncScheduler::new(engine.clone());

        assert_eq!(scheduler.trigger(TriggerSource::Manual), TriggerOutcome::Started);

        let mut status = engine.subscribe_status();
        timeout(
            Duration::from_secs(5),
            status.wait_for(|s| *s == SyncStatus::Fetching),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(scheduler.trigger(TriggerSource::Manual), TriggerOutcome::Dropped);
        assert!(scheduler.is_in_flight());

        remote.release_fetches();

        assert!(matches!(
            next_event(&mut events).await,
            SchedulerEvent::TriggerDropped(TriggerSource::Manual)
        ));
        match next_event(&mut events).await {
            SchedulerEvent::CycleFinished(report) => assert_eq!(report.merged, 1),
            other => panic!("unexpected event: {:?}", other),
        }

        assert_eq!(remote.fetch_count(), 1);
        assert!(!scheduler.is_in_flight());
    }

    #[tokio::test]
    async fn test_run_now_dropped_while_in_flight() {
        let temp_dir = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        let _gate = remote.hold_fetches();
        let engine = engine_with(remote.clone(), &temp_dir);
        let (scheduler, mut events) = SyncScheduler::new(engine);

        scheduler.trigger(TriggerSource::Timer);
        assert!(scheduler.run_now(TriggerSource::Manual).await.is_none());

        remote.release_fetches();
        assert!(matches!(
            next_event(&mut events).await,
            SchedulerEvent::TriggerDropped(TriggerSource::Manual)
        ));
        assert!(matches!(
            next_event(&mut events).await,
            SchedulerEvent::CycleFinished(_)
        ));

        // Free again: runs inline
        let result = scheduler.run_now(TriggerSource::Manual).await;
        assert!(matches!(result, Some(Ok(_))));
        assert_eq!(remote.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_cycle_clears_in_flight() {
        let temp_dir = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        remote.fail_with(crate::remote::NetworkError::Timeout);
        let engine = engine_with(remote.clone(), &temp_dir);
        let (scheduler, mut events) = SyncScheduler::new(engine);

        let result = scheduler.run_now(TriggerSource::Manual).await;
        assert!(matches!(result, Some(Err(_))));
        assert!(matches!(
            next_event(&mut events).await,
            SchedulerEvent::CycleFailed(_)
        ));
        assert!(!scheduler.is_in_flight());
    }

    #[tokio::test]
    async fn test_spawned_loop_ticks_and_shuts_down() {
        let temp_dir = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        let engine = engine_with(remote.clone(), &temp_dir);
        let (scheduler, mut events) = SyncScheduler::new(engine);

        let handle = scheduler.spawn(Duration::from_millis(20));

        for _ in 0..2 {
            assert!(matches!(
                next_event(&mut events).await,
                SchedulerEvent::CycleFinished(_)
            ));
        }

        handle.shutdown().await;
        assert!(remote.fetch_count() >= 2);
    }

    #[tokio::test]
    async fn test_handle_manual_trigger() {
        let temp_dir = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        remote.put("1", "One", "X");
        let engine = engine_with(remote.clone(), &temp_dir);
        let (scheduler, mut events) = SyncScheduler::new(engine.clone());

        let handle = scheduler.spawn(Duration::from_secs(3600));
        handle.trigger().await;

        match next_event(&mut events).await {
            SchedulerEvent::CycleFinished(report) => assert_eq!(report.merged, 1),
            other => panic!("unexpected event: {:?}", other),
        }
        handle.shutdown().await;
    }
}
