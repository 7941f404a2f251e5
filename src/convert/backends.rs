//! Conversion backends behind a single capability trait.
//!
//! Each backend is one way of turning a legacy `.doc` into a `.docx`.
//! Failure of a backend is a typed result the chain iterates past, never an
//! error that propagates out of the converter.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use tokio::process::Command;

use crate::utils::CONVERT_TIMEOUT_SECS;

/// Outcome of one backend attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertAttempt {
    /// Output file produced and non-empty
    Converted,
    /// Backend is not installed or not usable on this host
    Unavailable,
    /// Backend ran and failed
    Failed(String),
}

/// One conversion capability, tried in priority order by the chain
#[async_trait]
pub trait Converter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Attempt to produce `docx` from `doc`. Implementations must not leave
    /// a partial output file behind on failure.
    async fn try_convert(&self, doc: &Path, docx: &Path) -> ConvertAttempt;
}

/// Check that a produced output exists and is non-empty
fn output_usable(docx: &Path) -> bool {
    std::fs::metadata(docx).map(|m| m.len() > 0).unwrap_or(false)
}

fn discard_partial_output(docx: &Path) {
    if docx.exists() {
        let _ = std::fs::remove_file(docx);
    }
}

/// LibreOffice in headless mode, the highest-fidelity portable backend
pub struct LibreOfficeBackend {
    soffice: Option<PathBuf>,
}

impl LibreOfficeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            soffice: find_soffice(),
        }
    }
}

impl Default for LibreOfficeBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Locate the soffice binary: well-known install paths first, then PATH
fn find_soffice() -> Option<PathBuf> {
    let candidates: &[&str] = if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\LibreOffice\program\soffice.exe",
            r"C:\Program Files (x86)\LibreOffice\program\soffice.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &["/Applications/LibreOffice.app/Contents/MacOS/soffice"]
    } else {
        &["/usr/bin/libreoffice", "/usr/bin/soffice"]
    };

    for candidate in candidates {
        let path = Path::new(candidate);
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    find_in_path("soffice").or_else(|| find_in_path("libreoffice"))
}

fn find_in_path(binary: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

#[async_trait]
impl Converter for LibreOfficeBackend {
    fn name(&self) -> &'static str {
        "LibreOffice"
    }

    async fn try_convert(&self, doc: &Path, docx: &Path) -> ConvertAttempt {
        let Some(soffice) = &self.soffice else {
            return ConvertAttempt::Unavailable;
        };
        let Some(outdir) = doc.parent() else {
            return ConvertAttempt::Failed("document has no parent directory".into());
        };

        let run = Command::new(soffice)
            .arg("--headless")
            .arg("--convert-to")
            .arg("docx")
            .arg("--outdir")
            .arg(outdir)
            .arg(doc)
            .output();

        match tokio::time::timeout(Duration::from_secs(CONVERT_TIMEOUT_SECS), run).await {
            Ok(Ok(output)) if output.status.success() && output_usable(docx) => {
                ConvertAttempt::Converted
            }
            Ok(Ok(output)) => {
                discard_partial_output(docx);
                ConvertAttempt::Failed(format!(
                    "soffice exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ))
            }
            Ok(Err(e)) => {
                discard_partial_output(docx);
                ConvertAttempt::Failed(format!("cannot spawn soffice: {e}"))
            }
            Err(_) => {
                discard_partial_output(docx);
                ConvertAttempt::Failed(format!("soffice timed out after {CONVERT_TIMEOUT_SECS}s"))
            }
        }
    }
}

/// pandoc as the generic document-conversion library fallback
pub struct PandocBackend {
    pandoc: Option<PathBuf>,
}

impl PandocBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pandoc: find_in_path("pandoc"),
        }
    }
}

impl Default for PandocBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Converter for PandocBackend {
    fn name(&self) -> &'static str {
        "pandoc"
    }

    async fn try_convert(&self, doc: &Path, docx: &Path) -> ConvertAttempt {
        let Some(pandoc) = &self.pandoc else {
            return ConvertAttempt::Unavailable;
        };

        let run = Command::new(pandoc)
            .arg(doc)
            .arg("-o")
            .arg(docx)
            .arg("--wrap=none")
            .output();

        match tokio::time::timeout(Duration::from_secs(CONVERT_TIMEOUT_SECS), run).await {
            Ok(Ok(output)) if output.status.success() && output_usable(docx) => {
                ConvertAttempt::Converted
            }
            Ok(Ok(output)) => {
                discard_partial_output(docx);
                ConvertAttempt::Failed(format!(
                    "pandoc exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ))
            }
            Ok(Err(e)) => {
                discard_partial_output(docx);
                ConvertAttempt::Failed(format!("cannot spawn pandoc: {e}"))
            }
            Err(_) => {
                discard_partial_output(docx);
                ConvertAttempt::Failed(format!("pandoc timed out after {CONVERT_TIMEOUT_SECS}s"))
            }
        }
    }
}

/// Default backend chain in fidelity order
#[must_use]
pub fn default_backends() -> Vec<Box<dyn Converter>> {
    vec![
        Box::new(LibreOfficeBackend::new()),
        Box::new(PandocBackend::new()),
    ]
}

/// Log one failed attempt at the appropriate level
pub(crate) fn log_attempt(name: &str, doc: &Path, attempt: &ConvertAttempt) {
    match attempt {
        ConvertAttempt::Converted => {}
        ConvertAttempt::Unavailable => {
            debug!("{name} backend unavailable, trying next");
        }
        ConvertAttempt::Failed(reason) => {
            error!("{name} conversion of {} failed: {reason}", doc.display());
        }
    }
}
