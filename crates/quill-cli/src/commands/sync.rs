//! Sync command handlers

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use quill_core::{
    Choice, Config, HttpRemoteSource, LocalStore, ReconciliationEngine, SchedulerEvent,
    SyncReport, SyncScheduler,
};

use crate::output::Output;
use crate::prompt::{self, Answer};

/// Build an engine for the configured remote
pub fn build_engine(config: &Config) -> Result<Arc<ReconciliationEngine>> {
    if !config.sync_enabled {
        bail!(
            "Sync is not enabled. Enable it with:\n  \
             quill config set sync_enabled true\n  \
             quill config set remote_url https://your-server/entries"
        );
    }

    if config.remote_url.is_none() {
        bail!(
            "Remote URL not configured. Set it with:\n  \
             quill config set remote_url https://your-server/entries"
        );
    }

    let remote = HttpRemoteSource::from_config(config).context("Failed to set up remote")?;
    info!("Using remote {}", remote.url());

    Ok(Arc::new(ReconciliationEngine::new(
        LocalStore::open(config),
        Arc::new(remote),
    )))
}

/// Run one reconciliation cycle and settle its conflicts
pub async fn sync(config: &Config, prefer: Option<Choice>, output: &Output) -> Result<()> {
    let engine = build_engine(config)?;
    let interactive = prefer.is_none() && output.should_prompt() && prompt::is_interactive();

    output.message("Fetching remote entries...");
    run_sync(&engine, prefer, interactive, output).await?;
    Ok(())
}

/// Run a cycle on `engine`, then apply `prefer` or ask per conflict
///
/// Conflicts left unresolved are listed; the next cycle detects them again.
pub async fn run_sync(
    engine: &ReconciliationEngine,
    prefer: Option<Choice>,
    interactive: bool,
    output: &Output,
) -> Result<SyncReport> {
    let report = engine.run_once().await.context("Sync failed")?;

    if output.is_json() {
        settle(engine, prefer, false, output).await?;
        crate::output::print_json(&serde_json::json!({
            "report": report,
            "conflicts": engine.pending(),
        }));
        return Ok(report);
    }

    output.print_report(&report);
    settle(engine, prefer, interactive, output).await?;
    output.print_conflicts(&engine.pending());

    Ok(report)
}

/// Resolve pending conflicts by policy or by asking
async fn settle(
    engine: &ReconciliationEngine,
    prefer: Option<Choice>,
    interactive: bool,
    output: &Output,
) -> Result<()> {
    if let Some(choice) = prefer {
        let resolved = engine
            .resolve_all(choice)
            .await
            .context("Failed to resolve conflicts")?;
        if resolved > 0 {
            output.success(&format!(
                "Resolved {} conflict(s) keeping the {} version",
                resolved, choice
            ));
        }
        return Ok(());
    }

    if !interactive {
        return Ok(());
    }

    for record in engine.pending() {
        output.print_conflict(&record);
        match prompt::choose(&record)? {
            Answer::Pick(choice) => match engine.resolve(&record.remote_id, choice).await {
                Ok(_) => output.success(&format!(
                    "Kept the {} version of {}",
                    choice, record.remote_id
                )),
                Err(e) if e.is_not_found() => {
                    output.warn(&format!("Conflict {} was already settled", record.remote_id))
                }
                Err(e) => return Err(e).context("Failed to resolve conflict"),
            },
            Answer::Skip => {}
            Answer::Quit => break,
        }
    }

    Ok(())
}

/// Submit every local-only entry to the remote
pub async fn push(config: &Config, output: &Output) -> Result<()> {
    let engine = build_engine(config)?;
    push_all(&engine, output).await?;
    Ok(())
}

/// Submit local-only entries through `engine`
pub async fn push_all(engine: &ReconciliationEngine, output: &Output) -> Result<usize> {
    let submitted = engine.submit_pending().await.context("Push failed")?;

    if submitted == 0 {
        output.success("Nothing to push - every entry is on the remote");
    } else {
        output.success(&format!("Pushed {} entr{}", submitted, if submitted == 1 { "y" } else { "ies" }));
    }
    Ok(submitted)
}

/// Submit a freshly added entry when sync is ready
///
/// Failures only warn: the entry stays local-only and `quill push` retries.
pub async fn auto_push(config: &Config, local_id: &str, output: &Output) {
    if !config.sync_ready() {
        return;
    }

    let result = match build_engine(config) {
        Ok(engine) => engine.submit_entry(local_id).await.map_err(anyhow::Error::from),
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        output.warn(&format!(
            "Entry kept local-only ({}). Run `quill push` to retry.",
            e
        ));
    }
}

/// Run the scheduler until Ctrl-C
pub async fn watch(config: &Config, prefer: Option<Choice>, output: &Output) -> Result<()> {
    let engine = build_engine(config)?;
    let (scheduler, mut events) = SyncScheduler::new(engine.clone());
    let interval = config.sync_interval();
    let handle = scheduler.spawn(interval);

    output.message(&format!(
        "Syncing every {}s. Press Ctrl-C to stop.",
        interval.as_secs()
    ));
    handle.trigger().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                on_event(&engine, event, prefer, output).await;
            }
            _ = &mut shutdown => {
                output.message("Stopping...");
                break;
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

/// React to one scheduler event in watch mode
async fn on_event(
    engine: &ReconciliationEngine,
    event: SchedulerEvent,
    prefer: Option<Choice>,
    output: &Output,
) {
    match event {
        SchedulerEvent::CycleFinished(report) => {
            output.print_report(&report);
            if let Err(e) = settle(engine, prefer, false, output).await {
                output.warn(&format!("{:#}", e));
            }
            if prefer.is_none() && report.conflicts_raised > 0 {
                output.print_conflicts(&engine.pending());
            }
        }
        SchedulerEvent::CycleFailed(reason) => {
            output.warn(&format!("Sync failed: {}", reason));
        }
        SchedulerEvent::TriggerDropped(source) => {
            debug!("{:?} trigger dropped, cycle already running", source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use quill_core::{Entry, JsonPersistence, MemoryRemote, NetworkError};
    use tempfile::TempDir;

    fn linked(remote_id: &str, text: &str, category: &str) -> Entry {
        let mut entry = Entry::new(text, category).unwrap();
        entry.remote_id = Some(remote_id.to_string());
        entry
    }

    fn engine_with(
        temp_dir: &TempDir,
        entries: &[Entry],
        remote: Arc<MemoryRemote>,
    ) -> ReconciliationEngine {
        let store =
            LocalStore::with_persistence(JsonPersistence::new(temp_dir.path().join("entries.json")));
        store.save(entries).unwrap();
        ReconciliationEngine::new(store, remote)
    }

    #[test]
    fn test_build_engine_requires_enabled_sync() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            remote_url: Some("http://127.0.0.1:9/entries".to_string()),
            ..Config::default()
        };
        let err = build_engine(&config).err().unwrap();
        assert!(err.to_string().contains("not enabled"));

        let config = Config {
            sync_enabled: true,
            remote_url: None,
            ..config
        };
        let err = build_engine(&config).err().unwrap();
        assert!(err.to_string().contains("Remote URL"));
    }

    #[tokio::test]
    async fn test_run_sync_with_preference_resolves() {
        let temp_dir = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        remote.put("5", "B", "X");
        let engine = engine_with(&temp_dir, &[linked("5", "A", "X")], remote);
        let output = Output::new(OutputFormat::Quiet);

        let report = run_sync(&engine, Some(Choice::Remote), false, &output)
            .await
            .unwrap();

        assert_eq!(report.conflicts_raised, 1);
        assert_eq!(engine.pending_count(), 0);
        let entries = engine.entries().await.unwrap();
        assert_eq!(entries[0].text, "B");
    }

    #[tokio::test]
    async fn test_run_sync_without_policy_leaves_pending() {
        let temp_dir = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        remote.put("5", "B", "X");
        let engine = engine_with(&temp_dir, &[linked("5", "A", "X")], remote);
        let output = Output::new(OutputFormat::Quiet);

        run_sync(&engine, None, false, &output).await.unwrap();

        assert_eq!(engine.pending_count(), 1);
        assert_eq!(engine.entries().await.unwrap()[0].text, "A");
    }

    #[tokio::test]
    async fn test_run_sync_failure_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        remote.fail_with(NetworkError::Timeout);
        let engine = engine_with(&temp_dir, &[], remote);
        let output = Output::new(OutputFormat::Quiet);

        let err = run_sync(&engine, None, false, &output).await.unwrap_err();
        assert!(format!("{:#}", err).contains("timed out"));
    }

    #[tokio::test]
    async fn test_push_all_links_local_entries() {
        let temp_dir = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        let local = Entry::new("Fresh", "X").unwrap();
        let engine = engine_with(&temp_dir, &[local, linked("5", "A", "X")], remote.clone());
        let output = Output::new(OutputFormat::Quiet);

        assert_eq!(push_all(&engine, &output).await.unwrap(), 1);
        assert_eq!(remote.submit_count(), 1);
        assert!(engine
            .entries()
            .await
            .unwrap()
            .iter()
            .all(|e| e.remote_id.is_some()));

        // Second push has nothing left
        assert_eq!(push_all(&engine, &output).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_auto_push_skipped_when_sync_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };
        let output = Output::new(OutputFormat::Quiet);

        // Returns without touching the network or the store
        auto_push(&config, "missing", &output).await;
        assert!(!config.store_path().exists());
    }
}
