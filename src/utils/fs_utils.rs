//! Filename sanitization and guide-path construction.
//!
//! The portal's procedure codes and ministry names contain characters that
//! are invalid or ambiguous on at least one supported filesystem. Every
//! on-disk name goes through [`sanitize_filename`] so the same listing
//! produces the same layout on Windows, macOS and Linux.

use std::path::{Path, PathBuf};

use super::constants::{GUIDE_SUBDIR, MAX_FILENAME_CHARS};

/// Characters invalid in Windows filenames
const INVALID_CHARS: &str = "<>:\"/\\|?*";

/// Additional punctuation replaced for shell/URL safety
const PROBLEMATIC_CHARS: &str = "&%#@!+=~`$^{}[];,()";

/// Device names reserved by Windows regardless of extension
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Sanitize a string for use as a cross-platform filename.
///
/// Replaces filesystem-invalid and shell-ambiguous characters with `_`,
/// strips control characters, suffixes `_` onto reserved device-name stems,
/// strips trailing dots and spaces, and truncates to
/// [`MAX_FILENAME_CHARS`] characters. A string with nothing left after
/// sanitization becomes `unnamed_file`.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    if name.is_empty() {
        return "unnamed_file".to_string();
    }

    let mut out: String = name
        .chars()
        .map(|c| {
            if (c as u32) < 32 || INVALID_CHARS.contains(c) || PROBLEMATIC_CHARS.contains(c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Reserved names are checked against the stem before the first dot
    let stem = out.split('.').next().unwrap_or(&out);
    if RESERVED_NAMES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(stem))
    {
        out.push('_');
    }

    // Windows rejects names ending in a dot or space
    let trimmed = out.trim_end_matches(['.', ' ']);
    out = trimmed.to_string();

    if out.chars().count() > MAX_FILENAME_CHARS {
        out = out.chars().take(MAX_FILENAME_CHARS).collect();
        // Truncation can reintroduce a trailing dot or space
        out = out.trim_end_matches(['.', ' ']).to_string();
    }

    if out.is_empty() || out.chars().all(|c| c == '_' || c == '.') {
        return "unnamed_file".to_string();
    }

    out
}

/// Directory holding guide documents for one ministry
#[must_use]
pub fn guide_dir(download_dir: &Path, ministry: &str) -> PathBuf {
    download_dir
        .join(sanitize_filename(ministry))
        .join(GUIDE_SUBDIR)
}

/// Expected `.doc` and `.docx` paths for a procedure code inside a guide dir
#[must_use]
pub fn guide_paths(guide_dir: &Path, code: &str) -> (PathBuf, PathBuf) {
    let safe_code = sanitize_filename(code);
    (
        guide_dir.join(format!("{safe_code}.doc")),
        guide_dir.join(format!("{safe_code}.docx")),
    )
}
