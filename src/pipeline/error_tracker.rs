//! Categorized error tracking across a pipeline run.
//!
//! Failures are grouped so a long run can be triaged afterwards: path
//! problems point at the filesystem, permission problems at the host,
//! timeouts at the portal. Messages are truncated: the full detail is in
//! the log, the report is for counting.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;

/// Longest message retained per tracked error
const MAX_MESSAGE_CHARS: usize = 100;

/// Failure category for one tracked error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Timeout,
    PathLength,
    Permission,
    Conversion,
    Other,
}

impl ErrorCategory {
    /// Coarse keyword classification of an error message
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("timeout") || lower.contains("timed out") {
            Self::Timeout
        } else if lower.contains("path") {
            Self::PathLength
        } else if lower.contains("write-protected")
            || lower.contains("permission")
            || lower.contains("disk")
        {
            Self::Permission
        } else if lower.contains("conversion") || lower.contains("convert") {
            Self::Conversion
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackedError {
    pub procedure_code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ErrorReport<'a> {
    generated_at: String,
    total_errors: usize,
    errors_by_category: &'a BTreeMap<ErrorCategory, Vec<TrackedError>>,
}

/// Mutex-guarded error aggregation service, injected into workers.
#[derive(Debug, Default)]
pub struct ErrorTracker {
    errors: Mutex<BTreeMap<ErrorCategory, Vec<TrackedError>>>,
}

impl ErrorTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, category: ErrorCategory, procedure_code: &str, message: &str) {
        let truncated: String = message.chars().take(MAX_MESSAGE_CHARS).collect();
        self.errors
            .lock()
            .entry(category)
            .or_default()
            .push(TrackedError {
                procedure_code: procedure_code.to_string(),
                message: truncated,
            });
    }

    /// Classify and track in one step
    pub fn add_classified(&self, procedure_code: &str, message: &str) {
        self.add(ErrorCategory::classify(message), procedure_code, message);
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.errors.lock().values().map(Vec::len).sum()
    }

    /// Per-category counts for the end-of-run summary
    #[must_use]
    pub fn summary(&self) -> BTreeMap<ErrorCategory, usize> {
        self.errors
            .lock()
            .iter()
            .map(|(category, errors)| (*category, errors.len()))
            .collect()
    }

    /// Write the JSON error report; no-op when the run had no errors.
    pub fn save_report(&self, path: &Path) -> std::io::Result<()> {
        let errors = self.errors.lock().clone();
        if errors.is_empty() {
            return Ok(());
        }

        let report = ErrorReport {
            generated_at: Utc::now().to_rfc3339(),
            total_errors: errors.values().map(Vec::len).sum(),
            errors_by_category: &errors,
        };

        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| std::io::Error::other(format!("report serialization failed: {e}")))?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_keywords() {
        assert_eq!(
            ErrorCategory::classify("operation timed out after 45s"),
            ErrorCategory::Timeout
        );
        assert_eq!(
            ErrorCategory::classify("path too long for destination"),
            ErrorCategory::PathLength
        );
        assert_eq!(
            ErrorCategory::classify("file is write-protected"),
            ErrorCategory::Permission
        );
        assert_eq!(
            ErrorCategory::classify("conversion backend exited with 1"),
            ErrorCategory::Conversion
        );
        assert_eq!(
            ErrorCategory::classify("mystery failure"),
            ErrorCategory::Other
        );
    }

    #[test]
    fn test_messages_truncated() {
        let tracker = ErrorTracker::new();
        tracker.add(ErrorCategory::Other, "1.001", &"x".repeat(500));
        let errors = tracker.errors.lock();
        assert_eq!(errors[&ErrorCategory::Other][0].message.len(), 100);
    }

    #[test]
    fn test_empty_tracker_writes_no_report() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("errors.json");
        ErrorTracker::new().save_report(&path).expect("save");
        assert!(!path.exists());
    }

    #[test]
    fn test_report_contents() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("errors.json");
        let tracker = ErrorTracker::new();
        tracker.add_classified("1.001", "download timed out");
        tracker.add_classified("1.002", "no idea");
        tracker.save_report(&path).expect("save");

        let raw = std::fs::read_to_string(&path).expect("read report");
        let parsed: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
        assert_eq!(parsed["total_errors"], 2);
        assert!(parsed["errors_by_category"]["timeout"].is_array());
    }
}
