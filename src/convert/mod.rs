//! Legacy-format normalization with graceful degradation.
//!
//! Backends are tried in fixed priority order and the first one producing a
//! non-empty `.docx` wins. When every backend fails the converter degrades,
//! first to a read-only check of the legacy file (still usable for text
//! extraction), and finally to leaving the file untouched for manual review.
//! Conversion failure is never a terminal error for the pipeline; it only
//! narrows what downstream processing can do with the file.

pub mod backends;
pub mod path_safety;

use std::path::{Path, PathBuf};

use log::{info, warn};

pub use backends::{ConvertAttempt, Converter, default_backends};
pub use path_safety::{ConversionStaging, bounded_path};

/// Tagged result of a conversion pass.
///
/// Downstream code matches on the variant instead of sniffing path suffixes:
/// only `Converted` paths can be annotated, `ReadableOnly` paths still feed
/// text extraction, `Unprocessed` paths are kept for manual review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertOutcome {
    /// The packaged XML document at this path
    Converted(PathBuf),
    /// Legacy file left in place, but its text is extractable
    ReadableOnly(PathBuf),
    /// Legacy file left in place, nothing could read it
    Unprocessed(PathBuf),
}

impl ConvertOutcome {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Converted(p) | Self::ReadableOnly(p) | Self::Unprocessed(p) => p,
        }
    }

    #[must_use]
    pub fn into_path(self) -> PathBuf {
        match self {
            Self::Converted(p) | Self::ReadableOnly(p) | Self::Unprocessed(p) => p,
        }
    }
}

/// Ordered-backend document converter
pub struct DocConverter {
    backends: Vec<Box<dyn Converter>>,
}

impl DocConverter {
    #[must_use]
    pub fn new(backends: Vec<Box<dyn Converter>>) -> Self {
        Self { backends }
    }

    /// Normalize `path` to the packaged XML format.
    ///
    /// Already-normalized inputs and inputs with an existing normalized
    /// sibling short-circuit. Never fails fatally: the worst case is
    /// `Unprocessed` with the input left exactly as found.
    pub async fn convert(&self, path: &Path) -> ConvertOutcome {
        if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("docx")) {
            return ConvertOutcome::Converted(path.to_path_buf());
        }

        let docx_path = path.with_extension("docx");

        // A normalized sibling from an earlier run wins; the stale legacy
        // file is dropped so the cache validates against one artifact.
        if docx_path.exists() {
            if path.exists()
                && let Err(e) = std::fs::remove_file(path)
            {
                warn!("Cannot remove superseded legacy file {}: {e}", path.display());
            }
            return ConvertOutcome::Converted(docx_path);
        }

        let staging = match ConversionStaging::prepare(path, &docx_path) {
            Ok(s) => s,
            Err(e) => {
                warn!("Cannot stage {} for conversion: {e}", path.display());
                return self.degrade(path).await;
            }
        };

        let mut winner = None;
        for backend in &self.backends {
            let attempt = backend.try_convert(&staging.doc, &staging.docx).await;
            backends::log_attempt(backend.name(), path, &attempt);
            if attempt == ConvertAttempt::Converted {
                winner = Some(backend.name());
                break;
            }
        }

        if let Err(e) = staging.finish(winner.is_some()) {
            warn!("Cannot finalize staging for {}: {e}", path.display());
            return self.degrade(path).await;
        }

        match winner {
            Some(name) => {
                if path.exists()
                    && let Err(e) = std::fs::remove_file(path)
                {
                    warn!("Cannot remove legacy file {}: {e}", path.display());
                }
                info!("Converted {} with {name}", path.display());
                ConvertOutcome::Converted(docx_path)
            }
            None => self.degrade(path).await,
        }
    }

    /// All backends failed: probe whether the legacy file is at least
    /// readable, and keep it in place either way.
    async fn degrade(&self, path: &Path) -> ConvertOutcome {
        warn!("All conversion backends failed for {}", path.display());
        match crate::extract::read_legacy_text(path).await {
            Ok(text) if !text.trim().is_empty() => {
                info!(
                    "Keeping legacy file {} (readable without conversion)",
                    path.display()
                );
                ConvertOutcome::ReadableOnly(path.to_path_buf())
            }
            _ => {
                warn!(
                    "File kept for manual review: {}",
                    path.display()
                );
                ConvertOutcome::Unprocessed(path.to_path_buf())
            }
        }
    }
}

impl Default for DocConverter {
    fn default() -> Self {
        Self::new(default_backends())
    }
}
