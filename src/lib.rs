pub mod annotate;
pub mod cache;
pub mod config;
pub mod convert;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod utils;

pub use annotate::append_source_link;
pub use cache::{CacheEntry, ChecksumCache, StaleReason, compute_file_checksum, validate_existing_file};
pub use config::PipelineConfig;
pub use convert::{ConvertOutcome, Converter, DocConverter};
pub use extract::{ChunkMetadata, DocumentRecord, build_document_record, chunk_content, extract_text};
pub use fetch::{DocumentFetcher, FetchError, RetryPolicy, Retryable};
pub use pipeline::{
    ConsoleProgress, DownloadPipeline, DownloadStatus, GuideLinkLocator, HttpLinkLocator,
    LocatorFactory, NoOpProgress, ProcedureDescriptor, ProgressReporter, RunStats,
};

/// Run a full download pipeline over `procedures` with the live portal
/// locator and console progress reporting.
pub async fn download_guides(
    config: PipelineConfig,
    procedures: &[ProcedureDescriptor],
) -> anyhow::Result<RunStats> {
    let pipeline = DownloadPipeline::new(config);
    let factory = || -> anyhow::Result<Box<dyn GuideLinkLocator>> {
        Ok(Box::new(HttpLinkLocator::new()?))
    };
    let stats = pipeline.run(procedures, &factory, &ConsoleProgress).await?;
    pipeline.save_error_report()?;
    Ok(stats)
}
