//! # Media Transfer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Espansione delle directory sorgente in liste di file
//! - Creazione delle opzioni e avvio del batch
//!
//! ## Esempio di utilizzo:
//! ```bash
//! media-transfer ~/incoming --dest /music/sorted --transcode flac=mp3 --workers 8 --progress
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use media_transfer::{BulkTransfer, FileManager, TransferOptions};

#[derive(Parser)]
#[command(name = "media-transfer")]
#[command(about = "Copy or transcode media files into a canonically named tree")]
struct Args {
    /// Files or directories to transfer
    #[arg(required = true)]
    sources: Vec<PathBuf>,

    /// Destination root directory
    #[arg(short, long, default_value = ".")]
    dest: PathBuf,

    /// Force this album artist on every transferred file
    #[arg(short, long)]
    album_artist: Option<String>,

    /// Transcode rule as from=to (e.g. flac=mp3); may be repeated
    #[arg(short, long = "transcode", value_parser = parse_transcode_pair)]
    transcode: Vec<(String, String)>,

    /// Number of parallel workers
    #[arg(short, long, default_value = "4")]
    workers: usize,

    /// Print a per-file progress report
    #[arg(short, long)]
    progress: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_transcode_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((from, to)) if !from.is_empty() && !to.is_empty() => {
            Ok((from.to_lowercase(), to.to_lowercase()))
        }
        _ => Err(format!("expected from=to, got '{}'", raw)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Create the destination root if needed
    if !args.dest.exists() {
        std::fs::create_dir_all(&args.dest)?;
        info!("Created destination directory: {}", args.dest.display());
    }
    if !args.dest.is_dir() {
        return Err(anyhow::anyhow!(
            "destination is not a directory: {}",
            args.dest.display()
        ));
    }

    let files = FileManager::expand_sources(&args.sources)?;
    if files.is_empty() {
        info!("No media files found to transfer");
        return Ok(());
    }

    let options = TransferOptions {
        destination_root: args.dest,
        force_album_artist: args.album_artist,
        transcode: args.transcode.into_iter().collect(),
        max_workers: args.workers,
        show_progress: args.progress,
    };

    let summary = BulkTransfer::new(files, options).run().await?;
    if !summary.failed.is_empty() {
        anyhow::bail!("{} file(s) failed to transfer", summary.failed.len());
    }

    Ok(())
}
