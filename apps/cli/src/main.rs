//! hlsget CLI - download an HLS stream into a single file

mod progress;

use anyhow::Result;
use clap::Parser;
use console::style;
use hlsget_core::HlsgetDownloader;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// hlsget - HLS stream downloader
#[derive(Parser)]
#[command(name = "hlsget")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// URL of the HLS stream / m3u8 playlist to download
    #[arg(short, long)]
    url: String,

    /// Output file or directory (defaults to <unix-ts>.ts in the
    /// current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of segments downloaded concurrently
    #[arg(short, long, default_value_t = hlsget_core::DEFAULT_WORKERS)]
    workers: usize,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "hlsget_cli=debug,hlsget_core=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    debug!("Downloading {} with {} workers", cli.url, cli.workers);
    let bar = progress::SegmentProgress::new();
    let downloader = HlsgetDownloader::new(&cli.url, cli.output.as_deref())
        .await?
        .with_workers(cli.workers)?
        .with_progress(Arc::new(bar.clone()));
    debug!("Writing to {}", downloader.output_path().display());

    match downloader.download().await {
        Ok(path) => {
            bar.finish();
            println!(
                "{} Saved to {}",
                style("✓").green().bold(),
                style(path.display()).bold()
            );
            Ok(())
        }
        Err(e) => {
            bar.abandon();
            eprintln!("{} {e}", style("✗").red().bold());
            std::process::exit(1);
        }
    }
}
