//! Text extraction from guide documents.
//!
//! The packaged XML format is read directly (the docx package is a zip whose
//! `word/document.xml` carries the text); the legacy binary format falls
//! back to an `antiword` subprocess, mirroring the read-only degradation in
//! the converter. Extraction feeds the chunker and the downstream storage
//! handoff.

pub mod chunker;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use quick_xml::events::Event;
use serde::Serialize;

use crate::cache::digest_bytes;
use crate::pipeline::types::ProcedureDescriptor;

pub use chunker::{ChunkMetadata, chunk_content, count_words};

/// Extraction failures; the pipeline treats all of them as "no text
/// available", never as batch-fatal.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("cannot open document {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("not a readable docx package: {0}")]
    BadPackage(String),

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("legacy reader unavailable or failed: {0}")]
    LegacyReader(String),
}

/// Handoff payload for the downstream storage collaborator.
///
/// The pipeline's only obligation downstream is a local path plus this
/// metadata; persistence schema is external.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub procedure_code: String,
    pub title: String,
    pub source_url: String,
    pub file_path: PathBuf,
    pub content: String,
    pub content_hash: String,
    pub chunks: Vec<String>,
}

/// Extract plain text from a `.doc` or `.docx` file.
pub async fn extract_text(path: &Path) -> Result<String, ExtractError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("docx") => {
            let path = path.to_path_buf();
            tokio::task::spawn_blocking(move || extract_docx_text(&path))
                .await
                .map_err(|e| ExtractError::BadPackage(format!("extraction task panicked: {e}")))?
        }
        Some(ext) if ext.eq_ignore_ascii_case("doc") => read_legacy_text(path).await,
        _ => Err(ExtractError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Walk `word/document.xml` collecting paragraph text and table rows.
///
/// Table cells are joined with `" | "` and each table is bracketed with
/// marker lines so the chunker sees tables as their own paragraphs.
pub fn extract_docx_text(path: &Path) -> Result<String, ExtractError> {
    let file = std::fs::File::open(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| ExtractError::BadPackage(format!("not a zip archive: {e}")))?;

    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::BadPackage(format!("missing word/document.xml: {e}")))?
        .read_to_string(&mut document_xml)
        .map_err(|e| ExtractError::BadPackage(format!("unreadable document.xml: {e}")))?;

    let mut reader = quick_xml::Reader::from_str(&document_xml);
    reader.config_mut().trim_text(false);

    let mut lines: Vec<String> = Vec::new();
    let mut paragraph = String::new();
    let mut row_cells: Vec<String> = Vec::new();
    let mut cell_text = String::new();
    let mut table_depth = 0usize;
    let mut table_index = 0usize;
    let mut in_cell = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"tbl" => {
                    table_depth += 1;
                    if table_depth == 1 {
                        table_index += 1;
                        lines.push(format!("\n--- Bảng {table_index} ---"));
                    }
                }
                b"tc" if table_depth > 0 => {
                    in_cell = true;
                    cell_text.clear();
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"p" => {
                    if in_cell {
                        // Paragraph break inside a table cell
                        if !paragraph.trim().is_empty() {
                            if !cell_text.is_empty() {
                                cell_text.push(' ');
                            }
                            cell_text.push_str(paragraph.trim());
                        }
                    } else if !paragraph.trim().is_empty() {
                        lines.push(paragraph.trim().to_string());
                    }
                    paragraph.clear();
                }
                b"tc" => {
                    in_cell = false;
                    if !cell_text.trim().is_empty() {
                        row_cells.push(cell_text.trim().to_string());
                    }
                    cell_text.clear();
                }
                b"tr" if table_depth > 0 => {
                    if !row_cells.is_empty() {
                        lines.push(row_cells.join(" | "));
                        row_cells.clear();
                    }
                }
                b"tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 {
                        lines.push("--- Hết bảng ---\n".to_string());
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractError::BadPackage(format!("bad text encoding: {e}")))?;
                paragraph.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ExtractError::BadPackage(format!("malformed XML: {e}")));
            }
        }
    }

    Ok(lines.join("\n"))
}

/// Read the legacy binary format without converting it.
///
/// Shells out to `antiword`; used both for `.doc` extraction and as the
/// converter's read-only degradation probe.
pub async fn read_legacy_text(path: &Path) -> Result<String, ExtractError> {
    let run = tokio::process::Command::new("antiword").arg(path).output();

    let output = tokio::time::timeout(Duration::from_secs(30), run)
        .await
        .map_err(|_| ExtractError::LegacyReader("antiword timed out".into()))?
        .map_err(|e| ExtractError::LegacyReader(format!("cannot spawn antiword: {e}")))?;

    if !output.status.success() {
        return Err(ExtractError::LegacyReader(format!(
            "antiword exited with {}",
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Extract, chunk and fingerprint one finished document for storage handoff.
pub async fn build_document_record(
    path: &Path,
    descriptor: &ProcedureDescriptor,
) -> Result<DocumentRecord, ExtractError> {
    let content = extract_text(path).await?;
    debug!(
        "Extracted {} characters from {}",
        content.len(),
        path.display()
    );

    let metadata = ChunkMetadata {
        procedure_code: Some(descriptor.code.clone()),
        procedure_title: Some(descriptor.title.clone()),
        ..ChunkMetadata::default()
    };
    let chunks = chunk_content(
        &content,
        Some(&metadata),
        crate::utils::DEFAULT_TARGET_WORDS,
        crate::utils::DEFAULT_MAX_WORDS,
    );

    Ok(DocumentRecord {
        procedure_code: descriptor.code.clone(),
        title: descriptor.title.clone(),
        source_url: descriptor.detail_url.clone(),
        file_path: path.to_path_buf(),
        content_hash: digest_bytes(content.as_bytes()),
        content,
        chunks,
    })
}
