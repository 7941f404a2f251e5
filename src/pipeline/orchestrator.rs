//! Bounded-concurrency batch orchestration.
//!
//! Procedures are drained through a semaphore-gated task pool: up to
//! `max_workers` in flight, completions handled in whatever order they
//! finish. One procedure's failure, or panic, never stops the batch.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use log::{error, info, warn};
use tokio::sync::Semaphore;

use crate::cache::ChecksumCache;
use crate::config::PipelineConfig;
use crate::convert::DocConverter;
use crate::pipeline::error_tracker::ErrorTracker;
use crate::pipeline::link_locator::GuideLinkLocator;
use crate::pipeline::progress::{PROGRESS_INTERVAL, ProgressReporter};
use crate::pipeline::types::{DownloadStatus, ProcedureDescriptor, RunStats, SharedStats};
use crate::pipeline::worker::{WorkerContext, process_procedure};

/// Builds one locator per worker task so page sessions stay isolated
pub trait LocatorFactory: Send + Sync {
    fn create(&self) -> anyhow::Result<Box<dyn GuideLinkLocator>>;
}

impl<F> LocatorFactory for F
where
    F: Fn() -> anyhow::Result<Box<dyn GuideLinkLocator>> + Send + Sync,
{
    fn create(&self) -> anyhow::Result<Box<dyn GuideLinkLocator>> {
        self()
    }
}

/// A configured pipeline run over one ministry's procedure listing
pub struct DownloadPipeline {
    config: Arc<PipelineConfig>,
    cache: Arc<ChecksumCache>,
    converter: Arc<DocConverter>,
    errors: Arc<ErrorTracker>,
}

impl DownloadPipeline {
    /// Load (or create) the checksum cache and prepare the run
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let cache_file = config.cache_file();
        let cache = ChecksumCache::load(&cache_file);
        info!(
            "Loaded cache with {} entries from {}",
            cache.len(),
            cache_file.display()
        );

        Self {
            config: Arc::new(config),
            cache: Arc::new(cache),
            converter: Arc::new(DocConverter::new(crate::convert::default_backends())),
            errors: Arc::new(ErrorTracker::new()),
        }
    }

    /// Replace the converter backend chain, mainly for tests
    #[must_use]
    pub fn with_converter(mut self, converter: DocConverter) -> Self {
        self.converter = Arc::new(converter);
        self
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn error_tracker(&self) -> &ErrorTracker {
        &self.errors
    }

    /// Process every procedure in the listing and return the final counters.
    ///
    /// The cache is persisted once the batch completes, successfully or
    /// not, so a partial run still skips its finished work next time.
    pub async fn run(
        &self,
        procedures: &[ProcedureDescriptor],
        locator_factory: &dyn LocatorFactory,
        progress: &dyn ProgressReporter,
    ) -> anyhow::Result<RunStats> {
        let procedures: Vec<ProcedureDescriptor> = match self.config.limit() {
            Some(limit) => procedures.iter().take(limit).cloned().collect(),
            None => procedures.to_vec(),
        };
        let total = procedures.len();
        progress.report_started(total);

        let ministry_dir = self.config.ministry_dir();
        tokio::fs::create_dir_all(&ministry_dir)
            .await
            .with_context(|| format!("cannot create {}", ministry_dir.display()))?;

        let stats = SharedStats::new();
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers()));
        let mut active_tasks = FuturesUnordered::new();
        let mut queue = procedures.into_iter();
        let mut completed = 0usize;

        loop {
            // Fill up to the worker limit
            while active_tasks.len() < self.config.max_workers() {
                let Some(procedure) = queue.next() else { break };

                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => {
                        error!("Semaphore closed unexpectedly");
                        break;
                    }
                };

                let locator = match locator_factory.create() {
                    Ok(l) => l,
                    Err(e) => {
                        warn!("[{}] cannot create page session: {e:#}", procedure.code);
                        self.errors.add_classified(&procedure.code, &format!("{e:#}"));
                        stats.record(&DownloadStatus::OtherError);
                        completed += 1;
                        continue;
                    }
                };

                let ctx = WorkerContext {
                    config: Arc::clone(&self.config),
                    cache: Arc::clone(&self.cache),
                    converter: Arc::clone(&self.converter),
                    errors: Arc::clone(&self.errors),
                };
                let ministry_dir = ministry_dir.clone();

                let task = tokio::spawn(async move {
                    let _permit = permit; // Hold until task completes
                    process_procedure(&ctx, locator.as_ref(), &procedure, &ministry_dir).await
                });
                active_tasks.push(task);
            }

            // Wait for at least one task to complete
            match active_tasks.next().await {
                Some(Ok(outcome)) => {
                    completed += 1;
                    stats.record(&outcome.status);
                    progress.report_procedure(completed, total, &outcome.code, &outcome.status);
                }
                Some(Err(join_err)) => {
                    // A panicked worker counts as a failure, not a crash
                    error!("Worker task panicked: {join_err}");
                    completed += 1;
                    stats.record(&DownloadStatus::OtherError);
                }
                None => break, // All tasks completed
            }

            if completed % PROGRESS_INTERVAL == 0 || completed == total {
                progress.report_progress(completed, total, &stats.snapshot());
            }
        }

        let final_stats = stats.snapshot();
        progress.report_summary(&final_stats);

        self.persist_cache().await?;
        Ok(final_stats)
    }

    /// Process outcomes are only as durable as the cache file, so persist
    /// through a blocking task rather than off the async runtime.
    async fn persist_cache(&self) -> anyhow::Result<()> {
        let cache = Arc::clone(&self.cache);
        tokio::task::spawn_blocking(move || cache.persist())
            .await
            .context("cache persist task failed")??;
        Ok(())
    }

    /// Write the categorized error report next to the downloads, if any
    /// errors were recorded. Returns the report path when one was written.
    pub fn save_error_report(&self) -> anyhow::Result<Option<PathBuf>> {
        if self.errors.total() == 0 {
            return Ok(None);
        }
        let path = self.config.download_dir().join("error_report.json");
        self.errors.save_report(&path)?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::link_locator::LocateError;
    use crate::pipeline::progress::NoOpProgress;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoLinkLocator;

    #[async_trait]
    impl GuideLinkLocator for NoLinkLocator {
        async fn locate(
            &self,
            _procedure: &ProcedureDescriptor,
        ) -> Result<Option<String>, LocateError> {
            Ok(None)
        }
    }

    struct CountingFactory(AtomicUsize);

    impl LocatorFactory for CountingFactory {
        fn create(&self) -> anyhow::Result<Box<dyn GuideLinkLocator>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(NoLinkLocator))
        }
    }

    fn descriptor(n: usize) -> ProcedureDescriptor {
        ProcedureDescriptor {
            id: format!("id-{n}"),
            code: format!("1.{n:06}"),
            title: format!("Thủ tục số {n}"),
            detail_url: format!("https://example.invalid/p/{n}"),
        }
    }

    fn test_config(dir: &std::path::Path) -> PipelineConfig {
        PipelineConfig::builder()
            .download_dir(dir)
            .ministry("Bộ Thử nghiệm")
            .max_workers(3)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn procedures_without_links_count_as_failed() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = DownloadPipeline::new(test_config(dir.path()));
        let procedures: Vec<_> = (0..7).map(descriptor).collect();

        let factory = CountingFactory(AtomicUsize::new(0));
        let stats = pipeline
            .run(&procedures, &factory, &NoOpProgress)
            .await
            .unwrap();

        assert_eq!(stats.failed, 7);
        assert_eq!(stats.success, 0);
        assert_eq!(stats.cached, 0);
        // One isolated page session per procedure
        assert_eq!(factory.0.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn limit_truncates_the_listing() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::builder()
            .download_dir(dir.path())
            .ministry("Bộ Thử nghiệm")
            .limit(Some(2))
            .build()
            .unwrap();
        let pipeline = DownloadPipeline::new(config);
        let procedures: Vec<_> = (0..10).map(descriptor).collect();

        let factory = CountingFactory(AtomicUsize::new(0));
        let stats = pipeline
            .run(&procedures, &factory, &NoOpProgress)
            .await
            .unwrap();
        assert_eq!(stats.total(), 2);
    }

    #[tokio::test]
    async fn empty_listing_completes_and_persists_cache() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = DownloadPipeline::new(test_config(dir.path()));

        let factory = CountingFactory(AtomicUsize::new(0));
        let stats = pipeline.run(&[], &factory, &NoOpProgress).await.unwrap();
        assert_eq!(stats.total(), 0);
        assert!(pipeline.config().cache_file().exists());
    }
}
