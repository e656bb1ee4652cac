//! Quill CLI
//!
//! Command-line interface for Quill - categorized entries kept in step with
//! a remote collection.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use quill_core::{Choice, Config, LocalStore, QuillError, SessionCache, StorageError};

mod commands;
mod output;
mod prompt;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Quill - categorized entries with remote sync")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an entry
    Add {
        /// Entry text
        text: String,
        /// Entry category
        #[arg(short, long)]
        category: String,
    },
    /// List entries
    #[command(alias = "ls")]
    List {
        /// Only this category ("all" clears the remembered filter)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show a random entry
    Random,
    /// List all categories
    Categories,
    /// Import entries from a JSON file
    Import {
        /// File holding a JSON array of {text, category}
        file: PathBuf,
    },
    /// Export entries as JSON
    Export {
        /// Write here instead of stdout
        file: Option<PathBuf>,
    },
    /// Submit local-only entries to the remote
    Push,
    /// Reconcile with the remote once
    Sync {
        /// Settle every conflict with this side (local or remote)
        #[arg(long)]
        prefer: Option<Choice>,
    },
    /// Reconcile on the configured interval until Ctrl-C
    Watch {
        /// Settle every conflict with this side (local or remote)
        #[arg(long)]
        prefer: Option<Choice>,
    },
    /// Show status (sync state, storage, counts)
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, remote_url, sync_enabled, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let result = run(cli, &output).await;
    if let Err(ref e) = result {
        if let Some(hint) = recovery_hint(e) {
            output.warn(hint);
        }
    }
    result
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    // Config commands work even when the config file is broken
    if let Commands::Config { ref command } = cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);
    debug!("Using store {:?}", config.store_path());

    let store = LocalStore::open(&config);

    match cli.command {
        Commands::Add { text, category } => {
            let entry = commands::entry::add(&store, &text, &category, output)?;
            commands::sync::auto_push(&config, &entry.local_id, output).await;
            Ok(())
        }
        Commands::List { category } => commands::entry::list(&store, category, output),
        Commands::Random => {
            let mut session = SessionCache::new();
            commands::entry::random(&store, &mut session, output)
        }
        Commands::Categories => commands::entry::categories(&store, output),
        Commands::Import { file } => commands::transfer::import(&store, &file, output).map(|_| ()),
        Commands::Export { file } => commands::transfer::export(&store, file.as_deref(), output),
        Commands::Push => commands::sync::push(&config, output).await,
        Commands::Sync { prefer } => commands::sync::sync(&config, prefer, output).await,
        Commands::Watch { prefer } => commands::sync::watch(&config, prefer, output).await,
        Commands::Status => commands::status::show(&config, &store, output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// `--verbose` logs at debug level; otherwise `RUST_LOG` applies, falling
/// back to warnings only. Logs go to `log_file` when set, else stderr.
fn init_logging(config: &Config, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("quill_core=debug,quill_cli=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("quill_core=warn,quill_cli=warn"))
    };

    let (writer, to_file) = match config.log_file {
        Some(ref path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => (BoxMakeWriter::new(Mutex::new(file)), true),
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                (BoxMakeWriter::new(std::io::stderr), false)
            }
        },
        None => (BoxMakeWriter::new(std::io::stderr), false),
    };

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(!to_file)
        .with_writer(writer)
        .try_init();
}

/// Recovery advice for storage failures anywhere in the error chain
fn recovery_hint(error: &anyhow::Error) -> Option<&'static str> {
    error.chain().find_map(|cause| {
        if let Some(storage) = cause.downcast_ref::<StorageError>() {
            return storage.recovery_suggestion();
        }
        match cause.downcast_ref::<QuillError>() {
            Some(QuillError::Storage(storage)) => storage.recovery_suggestion(),
            _ => None,
        }
    })
}
