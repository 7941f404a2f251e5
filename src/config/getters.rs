//! Getter methods for `PipelineConfig`
//!
//! Accessor methods plus a few derived values (cache file location,
//! ministry folder, retry policy) used throughout the pipeline.

use std::path::PathBuf;
use std::time::Duration;

use super::types::PipelineConfig;
use crate::fetch::RetryPolicy;
use crate::utils::{CACHE_FILE_NAME, sanitize_filename};

impl PipelineConfig {
    #[must_use]
    pub fn download_dir(&self) -> &PathBuf {
        &self.download_dir
    }

    #[must_use]
    pub fn ministry(&self) -> &str {
        &self.ministry
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn retry_delay_secs(&self) -> u64 {
        self.retry_delay_secs
    }

    #[must_use]
    pub fn ignore_cache(&self) -> bool {
        self.ignore_cache
    }

    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    #[must_use]
    pub fn target_words(&self) -> usize {
        self.target_words
    }

    #[must_use]
    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Location of the checksum cache file
    #[must_use]
    pub fn cache_file(&self) -> PathBuf {
        self.cache_file
            .clone()
            .unwrap_or_else(|| self.download_dir.join(CACHE_FILE_NAME))
    }

    /// Folder under `download_dir` holding this ministry's documents
    #[must_use]
    pub fn ministry_dir(&self) -> PathBuf {
        self.download_dir.join(sanitize_filename(&self.ministry))
    }

    /// Retry policy for download attempts, derived from the retry knobs
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_secs(self.retry_delay_secs))
    }
}
