//! Shared configuration constants for guidescrape
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Base origin of the procedure portal
///
/// Relative download links scraped from detail pages are joined against
/// this origin before fetching. The portal serves document downloads from
/// the same host as the HTML pages.
pub const PORTAL_BASE_URL: &str = "https://thutuc.dichvucong.gov.vn";

/// Browser User-Agent sent with every portal request
///
/// The portal rejects or mis-serves requests carrying a default HTTP-client
/// User-Agent, so downloads impersonate a desktop Chrome build.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Accept header for guide-document downloads
///
/// Word formats first, wildcard last. Some portal endpoints key their
/// response format off this header.
pub const DOWNLOAD_ACCEPT: &str = "application/msword,application/vnd.openxmlformats-officedocument.wordprocessingml.document,*/*";

/// Accept-Language header for portal requests
pub const DOWNLOAD_ACCEPT_LANGUAGE: &str = "vi,en-US;q=0.9,en;q=0.8";

/// Default number of concurrent download workers
///
/// Each worker owns an independent HTTP session, so this also bounds the
/// number of open connections to the portal.
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Default fetch retry budget (attempts = retries + 1)
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default base delay between fetch retries, in seconds
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 3;

/// Per-request timeout for document downloads, in seconds
///
/// The portal is slow under load; 45s covers the observed worst case for
/// multi-megabyte guide documents without letting a stalled transfer pin
/// a worker indefinitely.
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 45;

/// Timeout for external conversion backends (LibreOffice, pandoc), in seconds
pub const CONVERT_TIMEOUT_SECS: u64 = 60;

/// Minimum plausible size for a downloaded guide document, in bytes
///
/// The portal returns short HTML error bodies with a 200 status under
/// load. Anything below this floor is treated as a failed download.
pub const MIN_DOCUMENT_BYTES: u64 = 500;

/// Block size for streaming checksum computation, in bytes
pub const CHECKSUM_BLOCK_BYTES: usize = 4096;

/// Maximum length for a sanitized filename, in characters
pub const MAX_FILENAME_CHARS: usize = 80;

/// Path-length ceiling honored before invoking conversion backends
///
/// Windows MAX_PATH is 260; staying under 200 leaves room for the backend's
/// own temporary suffixes.
pub const MAX_SAFE_PATH_CHARS: usize = 200;

/// Default filename of the persisted checksum cache
pub const CACHE_FILE_NAME: &str = "cache_ministries.json";

/// Subdirectory under each ministry folder holding guide documents
pub const GUIDE_SUBDIR: &str = "huong_dan";

/// Filename of the plain-text procedure listing written per ministry
pub const LISTING_FILE_NAME: &str = "danh_sach_thu_tuc.txt";

/// Default target words per chunk for downstream embedding
pub const DEFAULT_TARGET_WORDS: usize = 500;

/// Default maximum words per chunk
pub const DEFAULT_MAX_WORDS: usize = 800;

/// Chunks below this word count are discarded as noise
pub const MIN_CHUNK_WORDS: usize = 50;
