//! Status command handler

use anyhow::Result;
use chrono::{DateTime, Utc};

use quill_core::{Config, LocalStore};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(config: &Config, store: &LocalStore, output: &Output) -> Result<()> {
    let entries = store.load()?;
    let local_only = entries.iter().filter(|e| e.is_local_only()).count();
    let categories = store.categories()?;
    let last_sync = store.last_sync()?;
    let last_saved = store.last_saved_at()?;
    let last_filter = store.last_filter()?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "sync_enabled": config.sync_enabled,
                    "remote_url": config.remote_url,
                    "sync_interval_secs": config.sync_interval().as_secs(),
                    "store_path": store.persistence().path(),
                    "last_sync": last_sync,
                    "last_saved_at": last_saved,
                    "last_filter": last_filter,
                    "counts": {
                        "entries": entries.len(),
                        "local_only": local_only,
                        "categories": categories.len()
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", format_time(last_sync));
        }
        OutputFormat::Human => {
            println!("Quill Status");
            println!("============");
            println!();
            println!("Sync:");
            println!(
                "  Status:    {}",
                if config.sync_enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            if let Some(ref url) = config.remote_url {
                println!("  Remote:    {}", url);
            }
            println!("  Interval:  {}s", config.sync_interval().as_secs());
            println!("  Last sync: {}", format_time(last_sync));
            println!();
            println!("Storage:");
            println!("  Location:   {}", store.persistence().path().display());
            println!("  Last saved: {}", format_time(last_saved));
            println!();
            println!("Contents:");
            println!("  Entries:    {} ({} local only)", entries.len(), local_only);
            println!("  Categories: {}", categories.len());
            if let Some(ref filter) = last_filter {
                println!("  Filter:     {}", filter);
            }
        }
    }

    Ok(())
}

fn format_time(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}
