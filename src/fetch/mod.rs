//! Document fetcher: streamed download with multi-stage validation.
//!
//! The portal is observed to return HTML error pages and truncated bodies
//! with a 200 status under load, so a status-code check alone is not enough.
//! Every download goes through status, content-type, size-floor and header
//! probes before the file is accepted; anything else deletes the partial
//! output and consumes a retry attempt.

pub mod retry;

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use log::{debug, warn};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, REFERER, USER_AGENT};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::utils::{
    BROWSER_USER_AGENT, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_SECS, DOWNLOAD_ACCEPT,
    DOWNLOAD_ACCEPT_LANGUAGE, DOWNLOAD_TIMEOUT_SECS, MIN_DOCUMENT_BYTES,
};

pub use retry::{RetryPolicy, Retryable};

/// Per-attempt fetch failures, classified for the retry policy
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid download URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("unexpected HTTP status {status}")]
    BadStatus { status: u16 },

    #[error("server returned an HTML page instead of a document ({content_type})")]
    HtmlErrorPage { content_type: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("filesystem error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("downloaded file too small ({size} bytes, minimum {MIN_DOCUMENT_BYTES})")]
    TooSmall { size: u64 },

    #[error("downloaded file has an unreadable header")]
    BadHeader,
}

impl Retryable for FetchError {
    fn retryable(&self) -> bool {
        // A malformed URL will not improve with repetition; everything the
        // server or filesystem did to us might.
        !matches!(self, Self::InvalidUrl { .. })
    }

    fn escalating_delay(&self) -> bool {
        matches!(
            self,
            Self::BadStatus {
                status: 502 | 503 | 504 | 505
            }
        )
    }
}

/// HTTP document fetcher bound to one portal origin.
///
/// One fetcher per worker: the inner [`reqwest::Client`] is that worker's
/// private HTTP session, so connection state cannot leak across workers.
pub struct DocumentFetcher {
    client: reqwest::Client,
    base_url: Url,
    policy: RetryPolicy,
}

impl DocumentFetcher {
    /// Build a fetcher with the default retry policy (5 retries, 3s base delay).
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::with_policy(
            base_url,
            RetryPolicy::new(
                DEFAULT_MAX_RETRIES,
                Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            ),
        )
    }

    pub fn with_policy(base_url: &str, policy: RetryPolicy) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        let base_url = Url::parse(base_url)?;
        Ok(Self {
            client,
            base_url,
            policy,
        })
    }

    /// Resolve a possibly-relative portal link against the base origin
    pub fn resolve_url(&self, url: &str) -> Result<Url, FetchError> {
        let joined = if url.starts_with("http") {
            Url::parse(url)
        } else {
            self.base_url.join(url)
        };
        joined.map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })
    }

    /// Download `url` to `dest`, retrying per the configured policy.
    ///
    /// On success the file at `dest` has passed all validation stages. On
    /// failure any partial output has been removed.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        let resolved = self.resolve_url(url)?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| FetchError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let max_retries = self.policy.max_retries;
        self.policy
            .run(|attempt| {
                let resolved = resolved.clone();
                async move {
                    match self.fetch_once(&resolved, dest).await {
                        Ok(()) => {
                            debug!(
                                "Download of {resolved} succeeded on attempt {}",
                                attempt + 1
                            );
                            Ok(())
                        }
                        Err(e) => {
                            remove_partial(dest).await;
                            if attempt >= max_retries {
                                warn!(
                                    "Download of {resolved} failed after {} attempts: {e}",
                                    max_retries + 1
                                );
                            }
                            Err(e)
                        }
                    }
                }
            })
            .await
    }

    /// One download attempt: request, response checks, streamed write,
    /// post-write validation.
    async fn fetch_once(&self, url: &Url, dest: &Path) -> Result<(), FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, DOWNLOAD_ACCEPT)
            .header(ACCEPT_LANGUAGE, DOWNLOAD_ACCEPT_LANGUAGE)
            .header(REFERER, self.base_url.as_str())
            .header(CONNECTION, "keep-alive")
            .send()
            .await?;

        let status = response.status().as_u16();
        // 206 is fine: the portal occasionally answers range-style
        if status != 200 && status != 206 {
            return Err(FetchError::BadStatus { status });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if content_type.contains("text/html") && !content_type.contains("application") {
            return Err(FetchError::HtmlErrorPage { content_type });
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|source| FetchError::Io {
                path: dest.to_path_buf(),
                source,
            })?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|source| FetchError::Io {
                    path: dest.to_path_buf(),
                    source,
                })?;
        }
        file.flush().await.map_err(|source| FetchError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        drop(file);

        validate_downloaded_file(dest).await
    }
}

/// Post-write validation: the file must exist, clear the size floor, and
/// have a readable header of at least 4 bytes.
async fn validate_downloaded_file(path: &Path) -> Result<(), FetchError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let size = meta.len();
    if size < MIN_DOCUMENT_BYTES {
        return Err(FetchError::TooSmall { size });
    }

    let mut header = [0u8; 8];
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let n = tokio::io::AsyncReadExt::read(&mut file, &mut header)
        .await
        .map_err(|source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    if n < 4 {
        return Err(FetchError::BadHeader);
    }

    Ok(())
}

/// Best-effort removal of a partial or invalid download
async fn remove_partial(path: &Path) {
    if tokio::fs::try_exists(path).await.unwrap_or(false)
        && let Err(e) = tokio::fs::remove_file(path).await
    {
        warn!("Cannot remove partial download {}: {e}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_busy_statuses_escalate() {
        for status in [502, 503, 504, 505] {
            assert!(FetchError::BadStatus { status }.escalating_delay());
        }
        assert!(!FetchError::BadStatus { status: 500 }.escalating_delay());
        assert!(!FetchError::BadStatus { status: 404 }.escalating_delay());
    }

    #[test]
    fn test_invalid_url_not_retryable() {
        let err = FetchError::InvalidUrl {
            url: "::".into(),
            source: url::ParseError::EmptyHost,
        };
        assert!(!err.retryable());
        assert!(FetchError::BadStatus { status: 503 }.retryable());
        assert!(FetchError::TooSmall { size: 12 }.retryable());
    }

    #[tokio::test]
    async fn test_resolve_relative_url() {
        let fetcher = DocumentFetcher::new("https://thutuc.dichvucong.gov.vn").expect("fetcher");
        let resolved = fetcher
            .resolve_url("/p/home/download?id=9")
            .expect("resolves");
        assert_eq!(
            resolved.as_str(),
            "https://thutuc.dichvucong.gov.vn/p/home/download?id=9"
        );
    }

    #[tokio::test]
    async fn test_resolve_absolute_url_passthrough() {
        let fetcher = DocumentFetcher::new("https://thutuc.dichvucong.gov.vn").expect("fetcher");
        let resolved = fetcher
            .resolve_url("https://files.example.com/a.doc")
            .expect("resolves");
        assert_eq!(resolved.host_str(), Some("files.example.com"));
    }
}
