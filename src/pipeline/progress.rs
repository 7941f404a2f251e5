//! Progress reporting abstraction for pipeline runs.
//!
//! Implementations can print to the console, push to channels, or stay
//! silent; the orchestrator only talks to the trait.

use log::info;

use super::types::{DownloadStatus, RunStats};

/// Completions between interim progress reports
pub const PROGRESS_INTERVAL: usize = 5;

/// Trait for reporting pipeline progress at key lifecycle events
pub trait ProgressReporter: Send + Sync {
    /// Report that the run is starting with this many procedures
    fn report_started(&self, total: usize);

    /// Report one completed procedure (in completion order, not input order)
    fn report_procedure(&self, completed: usize, total: usize, code: &str, status: &DownloadStatus);

    /// Report interim counters, emitted every [`PROGRESS_INTERVAL`] completions
    fn report_progress(&self, completed: usize, total: usize, stats: &RunStats);

    /// Report the end-of-run summary
    fn report_summary(&self, stats: &RunStats);
}

/// Progress reporter that does nothing
#[derive(Debug, Clone, Copy)]
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    #[inline(always)]
    fn report_started(&self, _total: usize) {}

    #[inline(always)]
    fn report_procedure(
        &self,
        _completed: usize,
        _total: usize,
        _code: &str,
        _status: &DownloadStatus,
    ) {
    }

    #[inline(always)]
    fn report_progress(&self, _completed: usize, _total: usize, _stats: &RunStats) {}

    #[inline(always)]
    fn report_summary(&self, _stats: &RunStats) {}
}

/// Console reporter used by the CLI
#[derive(Debug, Clone, Copy)]
pub struct ConsoleProgress;

impl ProgressReporter for ConsoleProgress {
    fn report_started(&self, total: usize) {
        info!("Starting guide download for {total} procedures");
    }

    fn report_procedure(&self, completed: usize, total: usize, code: &str, status: &DownloadStatus) {
        match status {
            DownloadStatus::Cached => {
                info!("[{completed}/{total}] [{code}] already cached");
            }
            s if s.is_success() => {
                info!("[{completed}/{total}] [{code}] downloaded");
            }
            s => {
                info!("[{completed}/{total}] [{code}] failed ({s})");
            }
        }
    }

    fn report_progress(&self, completed: usize, total: usize, stats: &RunStats) {
        info!(
            "Progress: {completed}/{total} | ok {} | cached {} | failed {}",
            stats.success, stats.cached, stats.failed
        );
    }

    fn report_summary(&self, stats: &RunStats) {
        info!(
            "Run complete: {} downloaded, {} cached, {} failed",
            stats.success, stats.cached, stats.failed
        );
    }
}
