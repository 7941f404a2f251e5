//! Path-length safety for external conversion backends.
//!
//! LibreOffice and Word automation on Windows fail on paths past the
//! MAX_PATH ceiling. Before invoking a backend, overlong paths are rebuilt
//! with shortened directory segments, and when that still is not enough the
//! document is staged in a temp directory and the result copied back.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::utils::MAX_SAFE_PATH_CHARS;

/// Maximum length kept for a single directory segment when shortening
const MAX_SEGMENT_CHARS: usize = 30;

/// Compute a length-bounded variant of `path`.
///
/// Returns the input unchanged when it already fits. Otherwise directory
/// segments are truncated to [`MAX_SEGMENT_CHARS`] characters (marked with a
/// trailing `...`), and if the result still exceeds the ceiling the file is
/// addressed under `{temp}/doc_convert/` instead.
#[must_use]
pub fn bounded_path(path: &Path) -> PathBuf {
    let rendered = path.display().to_string();
    if rendered.chars().count() <= MAX_SAFE_PATH_CHARS {
        return path.to_path_buf();
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    let mut short = PathBuf::new();
    if let Some(parent) = path.parent() {
        for component in parent.components() {
            let part = component.as_os_str().to_string_lossy();
            if part.chars().count() > MAX_SEGMENT_CHARS {
                let truncated: String = part.chars().take(MAX_SEGMENT_CHARS - 3).collect();
                short.push(format!("{truncated}..."));
            } else {
                short.push(part.as_ref());
            }
        }
    }
    short.push(&file_name);

    if short.display().to_string().chars().count() <= MAX_SAFE_PATH_CHARS {
        return short;
    }

    std::env::temp_dir().join("doc_convert").join(file_name)
}

/// Staged copies of the input/output paths for one conversion.
///
/// When the originals already fit no copying happens and `finish` is a
/// no-op. Otherwise the legacy file is copied to the safe location before
/// conversion and the produced file copied back after, with the temporary
/// copies removed on every exit path.
pub struct ConversionStaging {
    pub doc: PathBuf,
    pub docx: PathBuf,
    original_doc: PathBuf,
    original_docx: PathBuf,
    relocated: bool,
}

impl ConversionStaging {
    pub fn prepare(doc: &Path, docx: &Path) -> std::io::Result<Self> {
        let safe_doc = bounded_path(doc);
        let safe_docx = bounded_path(docx);
        let relocated = safe_doc != doc;

        if relocated {
            if let Some(parent) = safe_doc.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(doc, &safe_doc)?;
            debug!("Using shortened path for conversion: {}", safe_doc.display());
        }

        Ok(Self {
            doc: safe_doc,
            docx: safe_docx,
            original_doc: doc.to_path_buf(),
            original_docx: docx.to_path_buf(),
            relocated,
        })
    }

    /// Copy a produced file back to the original location and drop the
    /// temporary copies. Safe to call whether or not conversion succeeded.
    pub fn finish(self, converted: bool) -> std::io::Result<()> {
        if !self.relocated && self.docx == self.original_docx {
            return Ok(());
        }

        if converted && self.docx != self.original_docx && self.docx.exists() {
            if let Some(parent) = self.original_docx.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&self.docx, &self.original_docx)?;
            if let Err(e) = std::fs::remove_file(&self.docx) {
                warn!("Cannot remove staged output {}: {e}", self.docx.display());
            }
        }

        if self.relocated
            && self.doc != self.original_doc
            && self.doc.exists()
            && let Err(e) = std::fs::remove_file(&self.doc)
        {
            warn!("Cannot remove staged copy {}: {e}", self.doc.display());
        }

        Ok(())
    }
}
