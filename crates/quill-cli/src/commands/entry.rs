//! Entry command handlers

use anyhow::{Context, Result};

use quill_core::{Entry, LocalStore, SessionCache};

use crate::output::Output;

/// Create a new entry
pub fn add(store: &LocalStore, text: &str, category: &str, output: &Output) -> Result<Entry> {
    let entry = store.add(text, category).context("Failed to add entry")?;

    output.success(&format!("Added entry {}", entry.local_id));
    output.print_entry(&entry);

    Ok(entry)
}

/// List entries, optionally filtered by category
///
/// An explicit `--category` is remembered for later runs; `all` clears it.
/// Without one, the remembered filter applies.
pub fn list(store: &LocalStore, category: Option<String>, output: &Output) -> Result<()> {
    if let Some(ref category) = category {
        store
            .record_filter(Some(category))
            .context("Failed to record category filter")?;
    }
    let filter = store.last_filter()?;

    if let Some(ref active) = filter {
        if category.is_none() {
            output.message(&format!("Category: {} (use --category all to clear)", active));
        }
    }

    let entries = store.filter(filter.as_deref())?;
    output.print_entries(&entries);
    Ok(())
}

/// Show one entry picked at random
pub fn random(store: &LocalStore, session: &mut SessionCache, output: &Output) -> Result<()> {
    let entries = store.filter(store.last_filter()?.as_deref())?;

    match session.random_entry(&entries) {
        Some(entry) => output.print_entry(&entry),
        None => output.message("No entries found."),
    }
    Ok(())
}

/// List all categories
pub fn categories(store: &LocalStore, output: &Output) -> Result<()> {
    let categories = store.categories()?;
    output.print_categories(&categories);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use quill_core::JsonPersistence;
    use tempfile::TempDir;

    fn setup() -> (TempDir, LocalStore, Output) {
        let temp_dir = TempDir::new().unwrap();
        let store =
            LocalStore::with_persistence(JsonPersistence::new(temp_dir.path().join("entries.json")));
        (temp_dir, store, Output::new(OutputFormat::Quiet))
    }

    #[test]
    fn test_add_persists() {
        let (_temp, store, output) = setup();
        let entry = add(&store, "  Hello  ", "Greeting", &output).unwrap();

        assert_eq!(entry.text, "Hello");
        assert!(store.get(&entry.local_id).unwrap().is_some());
    }

    #[test]
    fn test_add_rejects_blank() {
        let (_temp, store, output) = setup();
        let before = store.count().unwrap();

        assert!(add(&store, "   ", "Greeting", &output).is_err());
        assert!(add(&store, "Hello", "", &output).is_err());
        assert_eq!(store.count().unwrap(), before);
    }

    #[test]
    fn test_list_remembers_filter() {
        let (_temp, store, output) = setup();

        list(&store, Some("Work".to_string()), &output).unwrap();
        assert_eq!(store.last_filter().unwrap().as_deref(), Some("Work"));

        // No flag keeps the remembered filter
        list(&store, None, &output).unwrap();
        assert_eq!(store.last_filter().unwrap().as_deref(), Some("Work"));

        list(&store, Some("all".to_string()), &output).unwrap();
        assert_eq!(store.last_filter().unwrap(), None);
    }

    #[test]
    fn test_random_sets_last_viewed() {
        let (_temp, store, output) = setup();
        let mut session = SessionCache::new();

        random(&store, &mut session, &output).unwrap();
        let viewed = session.last_viewed().unwrap();
        assert!(store.get(&viewed.local_id).unwrap().is_some());
    }

    #[test]
    fn test_random_respects_filter() {
        let (_temp, store, output) = setup();
        store.record_filter(Some("Nothing here")).unwrap();
        let mut session = SessionCache::new();

        random(&store, &mut session, &output).unwrap();
        assert!(session.last_viewed().is_none());
    }
}
