//! CLI entry point: download, convert and annotate the guide documents
//! for one ministry's procedure listing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use guidescrape::pipeline::{ConsoleProgress, DownloadPipeline};
use guidescrape::{GuideLinkLocator, HttpLinkLocator, PipelineConfig, ProcedureDescriptor};

#[derive(Parser, Debug)]
#[command(name = "guidescrape", version, about = "Procedure guide document downloader")]
struct Cli {
    /// JSON file with the procedure listing for one ministry
    #[arg(value_name = "LISTING")]
    listing: PathBuf,

    /// Ministry display name, used as the output folder
    #[arg(short, long)]
    ministry: String,

    /// Root directory for downloaded documents
    #[arg(short, long, default_value = "./downloads")]
    download_dir: PathBuf,

    /// Concurrent download workers
    #[arg(short, long, default_value_t = guidescrape::utils::DEFAULT_MAX_WORKERS)]
    workers: usize,

    /// Retries after the initial download attempt
    #[arg(long, default_value_t = guidescrape::utils::DEFAULT_MAX_RETRIES)]
    retries: u32,

    /// Base delay in seconds between download attempts
    #[arg(long, default_value_t = guidescrape::utils::DEFAULT_RETRY_DELAY_SECS)]
    retry_delay: u64,

    /// Re-download everything, ignoring the checksum cache
    #[arg(long)]
    ignore_cache: bool,

    /// Process at most this many procedures
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let raw = std::fs::read_to_string(&cli.listing)
        .with_context(|| format!("cannot read listing {}", cli.listing.display()))?;
    let procedures: Vec<ProcedureDescriptor> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid listing {}", cli.listing.display()))?;
    info!("Loaded {} procedures for {}", procedures.len(), cli.ministry);

    let config = PipelineConfig::builder()
        .download_dir(&cli.download_dir)
        .ministry(&cli.ministry)
        .max_workers(cli.workers)
        .max_retries(cli.retries)
        .retry_delay_secs(cli.retry_delay)
        .ignore_cache(cli.ignore_cache)
        .limit(cli.limit)
        .build()?;

    write_listing_file(&config, &procedures)?;

    let pipeline = DownloadPipeline::new(config);
    let factory = || -> Result<Box<dyn GuideLinkLocator>> {
        Ok(Box::new(HttpLinkLocator::new()?))
    };
    let stats = pipeline.run(&procedures, &factory, &ConsoleProgress).await?;

    if let Some(report) = pipeline.save_error_report()? {
        warn!("Errors recorded, see {}", report.display());
    }

    info!(
        "Done: {} downloaded, {} cached, {} failed",
        stats.success, stats.cached, stats.failed
    );
    if stats.total() > 0 && stats.success + stats.cached == 0 {
        anyhow::bail!("every procedure failed");
    }
    Ok(())
}

/// Write the human-readable procedure index next to the downloads
fn write_listing_file(config: &PipelineConfig, procedures: &[ProcedureDescriptor]) -> Result<()> {
    let dir = config.ministry_dir();
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(guidescrape::utils::LISTING_FILE_NAME);

    let mut lines = String::new();
    lines.push_str(&format!(
        "Danh sách thủ tục hành chính - {}\n\n",
        config.ministry()
    ));
    for (index, procedure) in procedures.iter().enumerate() {
        lines.push_str(&format!(
            "{}. {} - {}\n",
            index + 1,
            procedure.code,
            procedure.title
        ));
    }
    std::fs::write(&path, lines).with_context(|| format!("cannot write {}", path.display()))
}
