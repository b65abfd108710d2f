//! CLI for dirmirror.

use anyhow::{Context, Result};
use clap::Parser;
use dirmirror_core::config;
use dirmirror_core::fetch::RetrievalChain;
use dirmirror_core::sync::{SyncEvent, SyncJob, Syncer};
use std::path::PathBuf;

/// Recursively download all files from an indexed URL that don't exist locally.
#[derive(Debug, Parser)]
#[command(name = "dirmirror")]
#[command(
    about = "Recursively download all files that don't exist locally from a CSV/JSON-indexed URL",
    long_about = None
)]
pub struct Cli {
    /// Recursively download files at URL.
    #[arg(short = 's', long = "source", value_name = "URL", value_parser = parse_source)]
    pub source: String,

    /// Store directory structure in DIR (created if missing).
    #[arg(short = 'd', long = "destination", value_name = "DIR")]
    pub destination: PathBuf,

    /// Use app token TOK to authenticate.
    #[arg(short = 't', long = "token", value_name = "TOK")]
    pub token: String,

    /// Read configuration from FILE instead of the XDG config dir.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Never shell out to the external HTTP client.
    #[arg(long)]
    pub no_fallback: bool,
}

/// Accepts only absolute URLs; the string itself is kept as given since the
/// index URL is formed by appending `.csv` / `.json` to it.
fn parse_source(s: &str) -> std::result::Result<String, String> {
    url::Url::parse(s)
        .map(|_| s.to_string())
        .map_err(|e| format!("invalid URL: {}", e))
}

fn print_event(event: &SyncEvent) {
    match event {
        SyncEvent::CreatingDir(path) => println!("creating dir: {}", path.display()),
        SyncEvent::Downloading(path) => println!("downloading: {}", path.display()),
        SyncEvent::Skipping(path) => println!("skipping: {}", path.display()),
        // Reported on stderr through tracing.
        SyncEvent::DownloadFailed(_) | SyncEvent::Rejected(_) => {}
    }
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        Cli::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let cfg = match &self.config {
            Some(path) => config::load_from(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);

        std::fs::create_dir_all(&self.destination)
            .with_context(|| format!("mkdir `{}'", self.destination.display()))?;

        let chain = RetrievalChain::from_config(&cfg, !self.no_fallback);
        tracing::info!(
            "mirroring {} into {} via {:?}",
            self.source,
            self.destination.display(),
            chain.transport_names()
        );
        let syncer = Syncer::new(chain);
        let job = SyncJob::new(&self.source, &self.destination, Some(&self.token));

        let task = tokio::task::spawn_blocking(move || {
            let mut on_event = print_event;
            syncer.sync_with(&job, &mut on_event)
        });

        tokio::select! {
            joined = task => {
                let report = joined.context("sync task failed")??;
                println!("done: {}", report);
                Ok(())
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("interrupted; partially written files may remain");
                anyhow::bail!("interrupted")
            }
        }
    }
}
