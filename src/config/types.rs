//! Core configuration types for the document pipeline
//!
//! This module contains the main `PipelineConfig` struct that defines the
//! parameters for a download-and-convert run against the procedure portal.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::{
    DEFAULT_MAX_RETRIES, DEFAULT_MAX_WORDS, DEFAULT_MAX_WORKERS, DEFAULT_RETRY_DELAY_SECS,
    DEFAULT_TARGET_WORDS,
};

/// Main configuration struct for pipeline runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root directory for downloaded documents.
    ///
    /// **INVARIANT:** Always an absolute path (normalized in builder).
    /// Cache keys embed this path, so a relative path would fracture the
    /// cache across working directories.
    pub(crate) download_dir: PathBuf,

    /// Display name of the ministry whose procedures are being processed.
    /// Sanitized into a folder name under `download_dir`.
    pub(crate) ministry: String,

    pub(crate) base_url: String,
    pub(crate) max_workers: usize,
    pub(crate) max_retries: u32,
    pub(crate) retry_delay_secs: u64,

    /// Force re-download even when a cached file validates
    pub(crate) ignore_cache: bool,

    /// Process at most this many procedures from the input listing
    pub(crate) limit: Option<usize>,

    /// Override for the cache file location.
    /// Default is `cache_ministries.json` inside `download_dir`.
    pub(crate) cache_file: Option<PathBuf>,

    pub(crate) target_words: usize,
    pub(crate) max_words: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("./downloads"),
            ministry: String::new(),
            base_url: crate::utils::PORTAL_BASE_URL.to_string(),
            max_workers: DEFAULT_MAX_WORKERS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            ignore_cache: false,
            limit: None,
            cache_file: None,
            target_words: DEFAULT_TARGET_WORDS,
            max_words: DEFAULT_MAX_WORDS,
        }
    }
}
