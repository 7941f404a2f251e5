//! Heuristic chunking for administrative-document text.
//!
//! Documents at or below the word ceiling stay whole. Longer documents are
//! split on the structural markers typical of Vietnamese administrative
//! formatting (Điều/Khoản articles, Roman and Arabic numbering, lettered
//! items), falling back to paragraph boundaries, with oversized sections
//! broken further on sentence boundaries. Best-effort segmentation: input
//! with no recognizable structure and no punctuation degrades to one
//! oversized chunk rather than being dropped.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::utils::MIN_CHUNK_WORDS;

/// Section-header patterns tried in priority order.
///
/// A pattern is used only when it matches at least twice; a single marker
/// is no evidence of document structure.
static SECTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?m)^Điều \d+[.:]",
        r"(?m)^Khoản \d+[.:]",
        r"(?m)^[IVX]+\.",
        r"(?m)^\d+\.",
        r"(?m)^[a-z]\)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("section pattern compiles"))
    .collect()
});

/// Sentence terminators followed by whitespace
static SENTENCE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+\s+").expect("sentence pattern compiles"));

/// Structured metadata prefixed to chunks so retrieval keeps the procedure
/// context even for mid-document segments.
#[derive(Debug, Clone, Default)]
pub struct ChunkMetadata {
    pub procedure_code: Option<String>,
    pub procedure_title: Option<String>,
    pub responsible_agency: Option<String>,
    pub processing_time: Option<String>,
    pub fee: Option<String>,
}

impl ChunkMetadata {
    /// Render the header lines for whichever fields are present
    #[must_use]
    pub fn header(&self) -> String {
        let mut parts = Vec::new();
        if let Some(code) = &self.procedure_code {
            parts.push(format!("Mã thủ tục: {code}"));
        }
        if let Some(title) = &self.procedure_title {
            parts.push(format!("Tên thủ tục: {title}"));
        }
        if let Some(agency) = &self.responsible_agency {
            parts.push(format!("Cơ quan: {agency}"));
        }
        if let Some(time) = &self.processing_time {
            parts.push(format!("Thời hạn: {time}"));
        }
        if let Some(fee) = &self.fee {
            parts.push(format!("Phí: {fee}"));
        }
        parts.join("\n")
    }
}

/// Count words in Vietnamese text (space-separated syllables)
#[must_use]
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split `content` into bounded-size chunks for embedding.
///
/// Documents at or below `max_words` stay whole. Beyond that, sections
/// accumulate into a chunk until it reaches `target_words`; `max_words` is
/// the hard ceiling a single unsplittable section may still exceed. Every
/// retained chunk has at least [`MIN_CHUNK_WORDS`] words.
#[must_use]
pub fn chunk_content(
    content: &str,
    metadata: Option<&ChunkMetadata>,
    target_words: usize,
    max_words: usize,
) -> Vec<String> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    let header = metadata
        .map(|m| m.header())
        .filter(|h| !h.is_empty())
        .map(|h| format!("{h}\n\n"))
        .unwrap_or_default();

    if count_words(content) <= max_words {
        return vec![format!("{header}{content}").trim().to_string()];
    }

    let header_words = count_words(&header);
    let mut chunks: Vec<String> = Vec::new();
    let mut current = header.clone();
    let mut current_words = header_words;

    for section in split_into_sections(content) {
        let section_words = count_words(&section);

        if current_words + section_words > max_words && current.trim() != header.trim() {
            chunks.push(current.trim().to_string());
            current = header.clone();
            current_words = header_words;
        }

        if section_words > max_words {
            chunks.extend(split_long_section(&section, &header, max_words));
            continue;
        }

        current.push_str(&section);
        current.push_str("\n\n");
        current_words += section_words;

        // The preferred size closes a chunk; only an unsplittable section
        // may carry one past it, up to the ceiling.
        if current_words >= target_words {
            chunks.push(current.trim().to_string());
            current = header.clone();
            current_words = header_words;
        }
    }

    if current.trim() != header.trim() {
        chunks.push(current.trim().to_string());
    }

    chunks
        .into_iter()
        .filter(|c| count_words(c) >= MIN_CHUNK_WORDS)
        .collect()
}

/// Split content on the first structural pattern with at least two matches,
/// falling back to blank-line paragraph boundaries.
#[must_use]
pub fn split_into_sections(content: &str) -> Vec<String> {
    for pattern in SECTION_PATTERNS.iter() {
        let starts: Vec<usize> = pattern.find_iter(content).map(|m| m.start()).collect();
        if starts.len() > 1 {
            let mut sections = Vec::with_capacity(starts.len());
            for (i, &start) in starts.iter().enumerate() {
                let end = starts.get(i + 1).copied().unwrap_or(content.len());
                let section = content[start..end].trim();
                if !section.is_empty() {
                    sections.push(section.to_string());
                }
            }
            return sections;
        }
    }

    content
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Break one oversized section on sentence boundaries, accumulating
/// sentences until `max_words` would be exceeded.
fn split_long_section(section: &str, header: &str, max_words: usize) -> Vec<String> {
    let mut parts: Vec<&str> = Vec::new();
    let mut last = 0usize;
    for boundary in SENTENCE_BOUNDARY.find_iter(section) {
        parts.push(&section[last..boundary.end()]);
        last = boundary.end();
    }
    if last < section.len() {
        parts.push(&section[last..]);
    }

    let header_words = count_words(header);
    let mut chunks = Vec::new();
    let mut current = header.to_string();
    let mut current_words = header_words;

    for part in parts {
        let part_words = count_words(part);
        if current_words + part_words <= max_words || current.trim() == header.trim() {
            // A single sentence past the ceiling is unsplittable; it goes
            // into its own chunk rather than being dropped.
            current.push_str(part);
            current_words += part_words;
        } else {
            chunks.push(current.trim().to_string());
            current = format!("{header}{part}");
            current_words = header_words + part_words;
        }
    }

    if current.trim() != header.trim() {
        chunks.push(current.trim().to_string());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("từ{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_short_document_stays_whole() {
        let content = words(300);
        let chunks = chunk_content(&content, None, 500, 800);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], content);
    }

    #[test]
    fn test_metadata_header_prefixed() {
        let metadata = ChunkMetadata {
            procedure_code: Some("1.001".into()),
            procedure_title: Some("Cấp hộ chiếu phổ thông".into()),
            ..ChunkMetadata::default()
        };
        let chunks = chunk_content(&words(100), Some(&metadata), 500, 800);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("Mã thủ tục: 1.001"));
        assert!(chunks[0].contains("Tên thủ tục: Cấp hộ chiếu phổ thông"));
    }

    #[test]
    fn test_splits_on_dieu_sections() {
        let content = format!(
            "Điều 1. {}\nĐiều 2. {}\nĐiều 3. {}",
            words(400),
            words(400),
            words(400)
        );
        let sections = split_into_sections(&content);
        assert_eq!(sections.len(), 3);
        assert!(sections[0].starts_with("Điều 1."));
        assert!(sections[2].starts_with("Điều 3."));
    }

    #[test]
    fn test_single_marker_falls_back_to_paragraphs() {
        let content = format!("Điều 1. mở đầu\n\n{}\n\n{}", words(20), words(30));
        let sections = split_into_sections(&content);
        assert_eq!(sections.len(), 3);
    }

    #[test]
    fn test_long_document_respects_max_words() {
        let sentences: String = (0..200)
            .map(|i| format!("Câu số {i} có đúng bảy từ nhé. "))
            .collect();
        let chunks = chunk_content(&sentences, None, 500, 800);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(count_words(chunk) <= 800, "chunk exceeds bound");
            assert!(count_words(chunk) >= MIN_CHUNK_WORDS, "noise chunk kept");
        }
    }

    #[test]
    fn test_tiny_trailing_chunks_discarded() {
        let content = format!(
            "1. {}\n2. {}\n3. chỉ vài từ thôi",
            words(700),
            words(700)
        );
        let chunks = chunk_content(&content, None, 500, 800);
        for chunk in &chunks {
            assert!(count_words(chunk) >= MIN_CHUNK_WORDS);
        }
    }

    #[test]
    fn test_unstructured_input_degrades_to_one_chunk() {
        // No sentence punctuation, no markers, no blank lines
        let content = words(1200);
        let chunks = chunk_content(&content, None, 500, 800);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(chunk_content("", None, 500, 800).is_empty());
        assert!(chunk_content("   \n  ", None, 500, 800).is_empty());
    }

    #[test]
    fn test_chunks_close_at_target_size() {
        let content: String = (1..=10)
            .map(|i| format!("Điều {i}. {}\n", words(300)))
            .collect();
        // Ceiling far above the target: chunks must still close near the
        // target instead of packing up to the ceiling
        let chunks = chunk_content(&content, None, 500, 2000);
        assert_eq!(chunks.len(), 5);
        for chunk in &chunks {
            let n = count_words(chunk);
            assert!((500..800).contains(&n), "chunk of {n} words");
        }
    }

    #[test]
    fn test_count_words() {
        assert_eq!(count_words("Cấp giấy phép xây dựng"), 5);
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("  một   hai  "), 2);
    }
}
