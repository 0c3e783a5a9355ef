//! depot CLI - Command line interface for the storage service
//!
//! Drives uploads, downloads, link shortening, and the periodic sync from
//! the command line. The sync subcommand is the intended target for a cron
//! or timer unit; everything else is a thin wrapper over the library.

use clap::{Parser, Subcommand};
use depot::{Config, Depot, Error, SyncOutcome};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "depot")]
#[command(about = "A pluggable object store with short links and batched git sync")]
#[command(version)]
struct Cli {
    /// Root directory for all stores (ignored when --config is given)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Path to a JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the stores and write a config file
    Init,

    // === Object Commands ===
    /// Store a file in a backend
    Upload {
        /// Backend name (flat, vcs, record)
        #[arg(short, long, default_value = "record")]
        backend: String,
        /// File to store
        file: PathBuf,
        /// Content type label
        #[arg(short, long)]
        content_type: Option<String>,
    },

    /// Retrieve an object by id
    Download {
        /// Backend name (flat, vcs, record)
        #[arg(short, long, default_value = "record")]
        backend: String,
        /// Object id
        id: String,
        /// Write the payload here instead of describing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List objects in a backend
    List {
        /// Backend name (flat, vcs, record)
        #[arg(short, long, default_value = "record")]
        backend: String,
    },

    /// Delete an object by id
    Delete {
        /// Backend name (flat, vcs, record)
        #[arg(short, long, default_value = "record")]
        backend: String,
        /// Object id
        id: String,
    },

    /// List registered backends
    Backends,

    // === Link Commands ===
    /// Create a short link
    Shorten {
        /// Target URL (absolute)
        url: String,
        /// Optional title
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Resolve a short code (counts as an access)
    Resolve {
        /// The short code
        code: String,
    },

    /// List all short links, newest first
    Links,

    // === Maintenance Commands ===
    /// Recent activity records
    Activity {
        /// Maximum entries to return
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Run the periodic sync if it is due
    Sync,

    /// Sync bookkeeping state
    Status,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match (&cli.config, &cli.root) {
        (Some(path), _) => Config::load(path)?,
        (None, Some(root)) => Config::with_root(root),
        (None, None) => Config::default(),
    };

    match cli.command {
        Commands::Init => {
            let depot = Depot::open(config)?;
            let config_path = depot.config().data_dir.join("config.json");
            depot.config().save(&config_path)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "config": config_path.display().to_string(),
                    "backends": depot.backends().names(),
                }),
            );
        }

        Commands::Upload {
            backend,
            file,
            content_type,
        } => {
            let depot = Depot::open(config)?;
            let content = std::fs::read(&file)?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| anyhow::anyhow!("Not a file path: {}", file.display()))?;
            let content_type =
                content_type.unwrap_or_else(|| "application/octet-stream".to_string());

            let receipt =
                depot
                    .backends()
                    .get(&backend)?
                    .store(&name, &content, &content_type, Some(&name))?;
            output(
                &cli.format,
                &serde_json::json!({
                    "backend": backend,
                    "id": receipt.id,
                    "stored_name": receipt.stored_name,
                    "size": content.len(),
                }),
            );
        }

        Commands::Download {
            backend,
            id,
            output: target,
        } => {
            let depot = Depot::open(config)?;
            let object = depot.backends().get(&backend)?.retrieve(&id)?;

            let written = match target {
                Some(path) => {
                    std::fs::write(&path, &object.content)?;
                    Some(path.display().to_string())
                }
                None => None,
            };
            output(
                &cli.format,
                &serde_json::json!({
                    "backend": backend,
                    "id": object.id,
                    "name": object.name,
                    "original_name": object.original_name,
                    "content_type": object.content_type,
                    "size": object.size,
                    "created_at": object.created_at,
                    "written_to": written,
                }),
            );
        }

        Commands::List { backend } => {
            let depot = Depot::open(config)?;
            let objects = depot.backends().get(&backend)?.list()?;
            output(
                &cli.format,
                &serde_json::json!({ "backend": backend, "objects": objects }),
            );
        }

        Commands::Delete { backend, id } => {
            let depot = Depot::open(config)?;
            depot.backends().get(&backend)?.delete(&id)?;
            output(
                &cli.format,
                &serde_json::json!({ "backend": backend, "deleted": id }),
            );
        }

        Commands::Backends => {
            let depot = Depot::open(config)?;
            output(
                &cli.format,
                &serde_json::json!({ "backends": depot.backends().names() }),
            );
        }

        Commands::Shorten { url, title } => {
            let depot = Depot::open(config)?;
            let code = depot.links().shorten(&url, title.as_deref())?;
            output(
                &cli.format,
                &serde_json::json!({ "code": code, "url": url }),
            );
        }

        Commands::Resolve { code } => {
            let depot = Depot::open(config)?;
            let url = depot.links().resolve(&code)?;
            output(&cli.format, &serde_json::json!({ "code": code, "url": url }));
        }

        Commands::Links => {
            let depot = Depot::open(config)?;
            let links = depot.links().list()?;
            output(&cli.format, &serde_json::json!({ "links": links }));
        }

        Commands::Activity { limit } => {
            let depot = Depot::open(config)?;
            let records = depot.activity().recent(limit)?;
            output(&cli.format, &serde_json::json!({ "activity": records }));
        }

        Commands::Sync => {
            let depot = Depot::open(config)?;
            // A failed sync is reported, never fatal: the next scheduled
            // invocation must still run.
            match depot.sync().perform_sync() {
                Ok(outcome) => {
                    let message = match &outcome {
                        SyncOutcome::NotNeeded => "Sync not needed yet",
                        SyncOutcome::NothingToCommit => "No changes to commit",
                        SyncOutcome::Completed { .. } => "Sync completed successfully",
                    };
                    output(
                        &cli.format,
                        &serde_json::json!({ "result": outcome, "message": message }),
                    );
                }
                Err(e @ (Error::StageFailure(_)
                | Error::CommitFailure(_)
                | Error::PushFailure(_)
                | Error::VcsCommand(_))) => {
                    output(
                        &cli.format,
                        &serde_json::json!({ "result": "failed", "error": e.to_string() }),
                    );
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Status => {
            let depot = Depot::open(config)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "last_sync": depot.sync().last_sync(),
                    "sync_needed": depot.sync().is_sync_needed(),
                    "dirty": depot.sync().dirty().is_dirty(),
                }),
            );
        }
    }

    Ok(())
}

fn output(format: &OutputFormat, value: &serde_json::Value) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(value).unwrap());
        }
        OutputFormat::Text => {
            println!("{}", serde_json::to_string_pretty(value).unwrap());
        }
    }
}
