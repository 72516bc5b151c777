use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use folio_core::{BookmarkStore, FileKeyValueStore, Position, ReaderConfig};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(
    name = "folio",
    version,
    about = "inspect and prune bookmark records saved by folio reading sessions"
)]
struct Args {
    /// Directory holding the bookmark records (defaults to the platform data dir)
    #[arg(long = "data-dir")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// List the bookmarks saved for a document, oldest first
    List {
        /// Document reference the bookmarks were saved under
        reference: String,

        /// Emit the bookmarks as JSON instead of the table form
        #[arg(long)]
        json: bool,
    },
    /// Remove the bookmark stored at a position
    Remove {
        /// Document reference the bookmark was saved under
        reference: String,
        /// Start position of the bookmark to remove
        position: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let project_dirs = ProjectDirs::from("net", "folio", "folio")
        .ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let _log_guard = init_logging(&project_dirs)?;

    let config = load_config(&project_dirs)?;
    let data_dir = args
        .data_dir
        .or(config.data_dir)
        .unwrap_or_else(|| project_dirs.data_local_dir().join("bookmarks"));
    let store = Arc::new(
        FileKeyValueStore::new(data_dir.clone())
            .with_context(|| format!("failed to open bookmark store at {:?}", data_dir))?,
    );

    debug!(?data_dir, "using bookmark store");

    match args.command {
        CliCommand::List { reference, json } => {
            let marks = BookmarkStore::for_document(store, &reference);
            let mut bookmarks = marks
                .get_all()
                .with_context(|| format!("failed to read bookmarks for {reference}"))?;
            bookmarks.sort_by_key(|bookmark| bookmark.created_at);
            if json {
                println!("{}", serde_json::to_string_pretty(&bookmarks)?);
                return Ok(());
            }
            if bookmarks.is_empty() {
                println!("no bookmarks for {reference}");
                return Ok(());
            }
            for (index, bookmark) in bookmarks.iter().enumerate() {
                let label = if bookmark.toc_label.is_empty() {
                    "-"
                } else {
                    bookmark.toc_label.as_str()
                };
                println!(
                    "{:>3}. {}  [{}]  {}",
                    index + 1,
                    bookmark.start,
                    label,
                    bookmark.theme.summary()
                );
            }
        }
        CliCommand::Remove {
            reference,
            position,
        } => {
            let marks = BookmarkStore::for_document(store, &reference);
            let removed = marks
                .remove(&Position::new(position.as_str()))
                .with_context(|| format!("failed to update bookmarks for {reference}"))?;
            match removed {
                Some(bookmark) => println!("removed bookmark at {}", bookmark.start),
                None => println!("no bookmark at {position}"),
            }
        }
    }

    Ok(())
}

fn load_config(project_dirs: &ProjectDirs) -> Result<ReaderConfig> {
    let path = project_dirs.config_dir().join("folio.toml");
    if !path.exists() {
        return Ok(ReaderConfig::default());
    }
    ReaderConfig::load(&path).with_context(|| format!("failed to load config {:?}", path))
}

fn init_logging(project_dirs: &ProjectDirs) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "folio.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}
