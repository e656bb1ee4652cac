//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use quill_core::{ConflictRecord, Entry, SyncReport};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Check if output is JSON
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single entry
    pub fn print_entry(&self, entry: &Entry) {
        match self.format {
            OutputFormat::Human => {
                println!("\"{}\"", entry.text);
                println!("  Category: {}", entry.category);
                println!(
                    "  Remote:   {}",
                    entry.remote_id.as_deref().unwrap_or("(local only)")
                );
                println!(
                    "  Modified: {}",
                    entry.last_modified.format("%Y-%m-%d %H:%M")
                );
            }
            OutputFormat::Json => print_json(entry),
            OutputFormat::Quiet => println!("{}", entry.local_id),
        }
    }

    /// Print a list of entries
    pub fn print_entries(&self, entries: &[Entry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No entries found.");
                    return;
                }
                for entry in entries {
                    let remote = match entry.remote_id {
                        Some(ref id) => format!("#{}", id),
                        None => "local".to_string(),
                    };
                    println!(
                        "{} | {} | {} | {}",
                        short_id(&entry.local_id),
                        truncate(&entry.category, 15),
                        truncate(&entry.text, 50),
                        remote
                    );
                }
                println!("\n{} entr{}", entries.len(), plural_y(entries.len()));
            }
            OutputFormat::Json => print_json(entries),
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.local_id);
                }
            }
        }
    }

    /// Print the sorted category list
    pub fn print_categories(&self, categories: &[String]) {
        match self.format {
            OutputFormat::Human => {
                if categories.is_empty() {
                    println!("No categories found.");
                    return;
                }
                for category in categories {
                    println!("{}", category);
                }
                println!("\n{} categor{}", categories.len(), plural_y(categories.len()));
            }
            OutputFormat::Json => print_json(categories),
            OutputFormat::Quiet => {
                for category in categories {
                    println!("{}", category);
                }
            }
        }
    }

    /// Print the outcome of a reconciliation cycle
    pub fn print_report(&self, report: &SyncReport) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "✓ Sync complete: {} merged, {} conflict(s) raised, {} pending",
                    report.merged, report.conflicts_raised, report.pending_conflicts
                );
                if report.has_more {
                    println!("  The remote has more entries than one fetch returns.");
                }
            }
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => {}
        }
    }

    /// Print one conflict side by side
    pub fn print_conflict(&self, record: &ConflictRecord) {
        match self.format {
            OutputFormat::Human => {
                println!("Conflict on remote entry {}:", record.remote_id);
                println!(
                    "  local:  [{}] {}",
                    record.local.category, record.local.text
                );
                println!(
                    "  remote: [{}] {}",
                    record.remote.category, record.remote.text
                );
            }
            OutputFormat::Json => print_json(record),
            OutputFormat::Quiet => println!("{}", record.remote_id),
        }
    }

    /// Print the pending conflicts
    pub fn print_conflicts(&self, records: &[ConflictRecord]) {
        match self.format {
            OutputFormat::Human => {
                if records.is_empty() {
                    return;
                }
                println!();
                for record in records {
                    self.print_conflict(record);
                }
                println!();
                println!(
                    "{} conflict(s) left unresolved. Run `quill sync --prefer local|remote` to settle them.",
                    records.len()
                );
            }
            OutputFormat::Json => print_json(records),
            OutputFormat::Quiet => {
                for record in records {
                    println!("{}", record.remote_id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warn(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode JSON output: {}", e),
    }
}

/// First eight characters of an ID
fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn plural_y(count: usize) -> &'static str {
    if count == 1 {
        "y"
    } else {
        "ies"
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
