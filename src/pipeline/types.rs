//! Core types for the download pipeline.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// One administrative-procedure record from the portal listing.
///
/// Produced by the upstream page-navigation collaborator; the pipeline
/// reads it and never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcedureDescriptor {
    /// Numeric portal id, unique per procedure
    pub id: String,
    /// Display code shown on the portal (e.g. `1.001.234`)
    pub code: String,
    pub title: String,
    /// Absolute URL of the procedure's detail page
    pub detail_url: String,
}

/// Terminal status of one procedure's trip through the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// Fetched, converted and annotated
    Success,
    /// Fetched and converted, but the footer could not be added
    SuccessDownloadOnly,
    /// Valid file already on disk, validated against the cache
    Cached,
    /// The detail page exposed no guide download link
    NoDownloadLink,
    /// Page interaction or download timed out past its retry budget
    TimeoutError,
    /// Anything else; the message is tracked separately
    OtherError,
}

impl DownloadStatus {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Success | Self::SuccessDownloadOnly | Self::Cached
        )
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::SuccessDownloadOnly => write!(f, "success_download_only"),
            Self::Cached => write!(f, "cached"),
            Self::NoDownloadLink => write!(f, "no_download_link"),
            Self::TimeoutError => write!(f, "timeout_error"),
            Self::OtherError => write!(f, "other_error"),
        }
    }
}

/// Per-procedure result handed back to the orchestrator
#[derive(Debug, Clone)]
pub struct ProcedureOutcome {
    pub code: String,
    pub status: DownloadStatus,
}

/// Run-level counters, aggregated across workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub success: usize,
    pub failed: usize,
    pub cached: usize,
}

impl RunStats {
    #[must_use]
    pub fn total(&self) -> usize {
        self.success + self.failed + self.cached
    }
}

/// Shared stats service; the lock is held only across the counter update.
#[derive(Debug, Default)]
pub struct SharedStats {
    inner: Mutex<RunStats>,
}

impl SharedStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, status: &DownloadStatus) {
        let mut stats = self.inner.lock();
        match status {
            DownloadStatus::Success | DownloadStatus::SuccessDownloadOnly => stats.success += 1,
            DownloadStatus::Cached => stats.cached += 1,
            DownloadStatus::NoDownloadLink
            | DownloadStatus::TimeoutError
            | DownloadStatus::OtherError => stats.failed += 1,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> RunStats {
        *self.inner.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_classification() {
        let stats = SharedStats::new();
        stats.record(&DownloadStatus::Success);
        stats.record(&DownloadStatus::SuccessDownloadOnly);
        stats.record(&DownloadStatus::Cached);
        stats.record(&DownloadStatus::NoDownloadLink);
        stats.record(&DownloadStatus::TimeoutError);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.success, 2);
        assert_eq!(snapshot.cached, 1);
        assert_eq!(snapshot.failed, 2);
        assert_eq!(snapshot.total(), 5);
    }

    #[test]
    fn test_status_display_matches_wire_names() {
        assert_eq!(DownloadStatus::SuccessDownloadOnly.to_string(), "success_download_only");
        assert_eq!(DownloadStatus::NoDownloadLink.to_string(), "no_download_link");
    }
}
