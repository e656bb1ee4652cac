//! Import and export command handlers

use std::path::Path;

use anyhow::{Context, Result};

use quill_core::storage::atomic_write;
use quill_core::LocalStore;

use crate::output::{Output, OutputFormat};

/// Import entries from a JSON file
pub fn import(store: &LocalStore, path: &Path, output: &Output) -> Result<usize> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {:?}", path))?;

    let added = store
        .import_json(&json)
        .with_context(|| format!("Failed to import {:?}", path))?;

    match output.format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "imported": added }));
        }
        OutputFormat::Quiet => println!("{}", added),
        OutputFormat::Human => println!("✓ Imported {} new entr{}", added, plural_y(added)),
    }

    Ok(added)
}

/// Export entries as JSON to a file, or to stdout when no file is given
pub fn export(store: &LocalStore, path: Option<&Path>, output: &Output) -> Result<()> {
    let json = store.export_json().context("Failed to export entries")?;

    match path {
        Some(path) => {
            atomic_write(path, json.as_bytes())
                .with_context(|| format!("Failed to write export file: {:?}", path))?;
            output.success(&format!("Exported {} entries to {}", store.count()?, path.display()));
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn plural_y(count: usize) -> &'static str {
    if count == 1 {
        "y"
    } else {
        "ies"
    }
}
