//! Traceability footer annotation for normalized documents.
//!
//! Every successfully processed document gets a footer paragraph linking
//! back to its source detail page, so a reader of the stored file can always
//! find the authoritative original. The file is backed up before editing
//! and restored on any failure; an annotation failure therefore degrades to
//! "file usable without footer", never to a lost file.

pub mod docx;

use std::path::{Path, PathBuf};

use log::{debug, warn};

pub use docx::FOOTER_LEAD_IN;

/// Append the source-link footer to the document at `path`.
///
/// Only the packaged XML format is supported: a legacy `.doc` path is a
/// no-op returning the input unchanged. Returns `None` when annotation
/// failed and the backup was restored; the caller must treat the
/// pre-annotation file as the usable artifact in that case.
pub async fn append_source_link(path: &Path, url: &str) -> Option<PathBuf> {
    if !path.extension().is_some_and(|e| e.eq_ignore_ascii_case("docx")) {
        debug!(
            "Annotation supports only .docx, leaving {} unchanged",
            path.display()
        );
        return Some(path.to_path_buf());
    }

    let path = path.to_path_buf();
    let url = url.to_string();
    match tokio::task::spawn_blocking(move || annotate_with_backup(&path, &url)).await {
        Ok(result) => result,
        Err(e) => {
            warn!("Annotation task panicked: {e}");
            None
        }
    }
}

fn annotate_with_backup(path: &Path, url: &str) -> Option<PathBuf> {
    let backup_path = backup_path_for(path);

    if let Err(e) = std::fs::copy(path, &backup_path) {
        warn!("Cannot back up {} before annotation: {e}", path.display());
        // Without a backup the edit is not attempted; the file as-is is
        // still the usable artifact.
        return Some(path.to_path_buf());
    }

    match docx::append_footer_sync(path, url) {
        Ok(()) => {
            if let Err(e) = std::fs::remove_file(&backup_path) {
                warn!("Cannot remove backup {}: {e}", backup_path.display());
            }
            debug!("Appended source link to {}", path.display());
            Some(path.to_path_buf())
        }
        Err(e) => {
            warn!("Annotation of {} failed: {e}", path.display());
            restore_backup(&backup_path, path);
            None
        }
    }
}

fn backup_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".backup");
    PathBuf::from(os)
}

fn restore_backup(backup_path: &Path, path: &Path) {
    if !backup_path.exists() {
        return;
    }
    if let Err(e) = std::fs::rename(backup_path, path) {
        warn!(
            "Cannot restore backup {} over {}: {e}",
            backup_path.display(),
            path.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_legacy_doc_is_noop() {
        let result = append_source_link(Path::new("/tmp/guide.doc"), "https://example.com").await;
        assert_eq!(result, Some(PathBuf::from("/tmp/guide.doc")));
    }

    #[tokio::test]
    async fn test_corrupt_docx_restored_from_backup() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("guide.docx");
        std::fs::write(&path, b"definitely not a zip").expect("write");

        let result = append_source_link(&path, "https://example.com").await;

        assert!(result.is_none());
        // Original bytes survived the failed edit
        assert_eq!(
            std::fs::read(&path).expect("read back"),
            b"definitely not a zip"
        );
        assert!(!backup_path_for(&path).exists());
    }
}
