//! Type-safe builder for `PipelineConfig` using the typestate pattern
//!
//! The builder will not produce a config until both required fields, the
//! download directory and the ministry name, have been supplied.

use anyhow::Result;
use std::marker::PhantomData;
use std::path::PathBuf;

use super::types::PipelineConfig;
use crate::utils::{
    DEFAULT_MAX_RETRIES, DEFAULT_MAX_WORDS, DEFAULT_MAX_WORKERS, DEFAULT_RETRY_DELAY_SECS,
    DEFAULT_TARGET_WORDS, PORTAL_BASE_URL,
};

// Type states for the builder
pub struct WithDownloadDir;
pub struct WithMinistry;

pub struct PipelineConfigBuilder<State = ()> {
    pub(crate) download_dir: Option<PathBuf>,
    pub(crate) ministry: Option<String>,
    pub(crate) base_url: String,
    pub(crate) max_workers: usize,
    pub(crate) max_retries: u32,
    pub(crate) retry_delay_secs: u64,
    pub(crate) ignore_cache: bool,
    pub(crate) limit: Option<usize>,
    pub(crate) cache_file: Option<PathBuf>,
    pub(crate) target_words: usize,
    pub(crate) max_words: usize,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for PipelineConfigBuilder<()> {
    fn default() -> Self {
        Self {
            download_dir: None,
            ministry: None,
            base_url: PORTAL_BASE_URL.to_string(),
            max_workers: DEFAULT_MAX_WORKERS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            ignore_cache: false,
            limit: None,
            cache_file: None,
            target_words: DEFAULT_TARGET_WORDS,
            max_words: DEFAULT_MAX_WORDS,
            _phantom: PhantomData,
        }
    }
}

impl PipelineConfig {
    /// Create a builder for configuring a `PipelineConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder<()> {
        PipelineConfigBuilder::default()
    }
}

impl PipelineConfigBuilder<()> {
    pub fn download_dir(self, dir: impl Into<PathBuf>) -> PipelineConfigBuilder<WithDownloadDir> {
        PipelineConfigBuilder {
            download_dir: Some(dir.into()),
            ministry: self.ministry,
            base_url: self.base_url,
            max_workers: self.max_workers,
            max_retries: self.max_retries,
            retry_delay_secs: self.retry_delay_secs,
            ignore_cache: self.ignore_cache,
            limit: self.limit,
            cache_file: self.cache_file,
            target_words: self.target_words,
            max_words: self.max_words,
            _phantom: PhantomData,
        }
    }
}

impl PipelineConfigBuilder<WithDownloadDir> {
    pub fn ministry(self, name: impl Into<String>) -> PipelineConfigBuilder<WithMinistry> {
        PipelineConfigBuilder {
            download_dir: self.download_dir,
            ministry: Some(name.into()),
            base_url: self.base_url,
            max_workers: self.max_workers,
            max_retries: self.max_retries,
            retry_delay_secs: self.retry_delay_secs,
            ignore_cache: self.ignore_cache,
            limit: self.limit,
            cache_file: self.cache_file,
            target_words: self.target_words,
            max_words: self.max_words,
            _phantom: PhantomData,
        }
    }
}

// Build method only available when all required fields are set
impl PipelineConfigBuilder<WithMinistry> {
    pub fn build(self) -> Result<PipelineConfig> {
        let raw_dir = self
            .download_dir
            .ok_or_else(|| anyhow::anyhow!("download_dir not set"))?;
        let ministry = self
            .ministry
            .ok_or_else(|| anyhow::anyhow!("ministry not set"))?;

        // Normalize to an absolute path so cache keys stay stable no
        // matter where the process was launched from
        let download_dir = if raw_dir.is_absolute() {
            raw_dir
        } else {
            std::env::current_dir()?.join(raw_dir)
        };

        if ministry.trim().is_empty() {
            anyhow::bail!("ministry name must not be empty");
        }
        if self.max_words < self.target_words {
            anyhow::bail!(
                "max_words ({}) must be >= target_words ({})",
                self.max_words,
                self.target_words
            );
        }

        Ok(PipelineConfig {
            download_dir,
            ministry,
            base_url: self.base_url,
            // A zero-width worker pool would deadlock the semaphore
            max_workers: self.max_workers.max(1),
            max_retries: self.max_retries,
            retry_delay_secs: self.retry_delay_secs,
            ignore_cache: self.ignore_cache,
            limit: self.limit,
            cache_file: self.cache_file,
            target_words: self.target_words,
            max_words: self.max_words,
        })
    }
}
