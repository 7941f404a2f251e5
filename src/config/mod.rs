//! Configuration module for pipeline runs
//!
//! This module provides the `PipelineConfig` struct and its type-safe builder
//! for configuring download runs with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::{PipelineConfigBuilder, WithDownloadDir, WithMinistry};
pub use types::PipelineConfig;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let config = PipelineConfig::builder()
            .download_dir("/tmp/docs")
            .ministry("Bộ Tư pháp")
            .build()
            .unwrap();

        assert_eq!(config.max_workers(), crate::utils::DEFAULT_MAX_WORKERS);
        assert_eq!(config.max_retries(), crate::utils::DEFAULT_MAX_RETRIES);
        assert!(!config.ignore_cache());
        assert_eq!(
            config.cache_file(),
            std::path::Path::new("/tmp/docs").join(crate::utils::CACHE_FILE_NAME)
        );
    }

    #[test]
    fn relative_download_dir_is_normalized() {
        let config = PipelineConfig::builder()
            .download_dir("relative/docs")
            .ministry("Bộ Y tế")
            .build()
            .unwrap();
        assert!(config.download_dir().is_absolute());
    }

    #[test]
    fn zero_workers_is_clamped() {
        let config = PipelineConfig::builder()
            .download_dir("/tmp/docs")
            .ministry("Bộ Công an")
            .max_workers(0)
            .build()
            .unwrap();
        assert_eq!(config.max_workers(), 1);
    }

    #[test]
    fn empty_ministry_is_rejected() {
        let result = PipelineConfig::builder()
            .download_dir("/tmp/docs")
            .ministry("   ")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn inverted_chunk_bounds_are_rejected() {
        let result = PipelineConfig::builder()
            .download_dir("/tmp/docs")
            .ministry("Bộ Tài chính")
            .target_words(900)
            .max_words(800)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn ministry_dir_uses_sanitized_name() {
        let config = PipelineConfig::builder()
            .download_dir("/tmp/docs")
            .ministry("Bộ: Kế hoạch/Đầu tư")
            .build()
            .unwrap();
        let dir = config.ministry_dir();
        let name = dir.file_name().unwrap().to_string_lossy();
        assert!(!name.contains(':'));
        assert!(!name.contains('/'));
    }
}
