//! Guide-link location on procedure detail pages.
//!
//! The seam between the pipeline and the portal's page structure: the
//! orchestrator only knows about [`GuideLinkLocator`], so the selector
//! logic (and the retry-worthy flakiness of the portal's rendering) stays
//! behind one trait. The detail page's link element is sometimes not yet
//! rendered when queried, so callers retry location a few times with a
//! short fixed delay.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::USER_AGENT;
use scraper::{Html, Selector};

use crate::fetch::{RetryPolicy, Retryable};
use crate::pipeline::types::ProcedureDescriptor;
use crate::utils::BROWSER_USER_AGENT;

/// Retries for the link-location step, distinct from the fetcher's budget
const LOCATE_MAX_RETRIES: u32 = 2;
const LOCATE_RETRY_DELAY_SECS: u64 = 2;

/// Errors surfaced by a locator implementation
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("cannot load detail page: {0}")]
    PageLoad(String),

    #[error("detail page request timed out")]
    Timeout,
}

impl Retryable for LocateError {
    fn retryable(&self) -> bool {
        true
    }
}

/// Locates the guide-document download link on a procedure's detail page.
///
/// `Ok(None)` means the page rendered but carries no download link: a
/// terminal condition, not a transient one.
#[async_trait]
pub trait GuideLinkLocator: Send + Sync {
    async fn locate(&self, procedure: &ProcedureDescriptor) -> Result<Option<String>, LocateError>;
}

/// Retry wrapper shared by all locator implementations: up to 3 attempts
/// with a fixed 2s delay, matching the portal's observed render lag.
pub async fn locate_with_retry<L: GuideLinkLocator + ?Sized>(
    locator: &L,
    procedure: &ProcedureDescriptor,
) -> Result<Option<String>, LocateError> {
    let policy = RetryPolicy::new(
        LOCATE_MAX_RETRIES,
        Duration::from_secs(LOCATE_RETRY_DELAY_SECS),
    );
    policy.run(|_| locator.locate(procedure)).await
}

/// HTTP + selector implementation against the live portal.
///
/// Each worker constructs its own locator so page sessions stay isolated,
/// mirroring the per-worker HTTP session used for the byte transfer.
pub struct HttpLinkLocator {
    client: reqwest::Client,
}

impl HttpLinkLocator {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }

    /// Three selector strategies in decreasing specificity, matching how
    /// the portal marks its Word-document download anchors.
    fn find_link(document: &Html) -> Option<String> {
        // Strategy 1: anchor titled as a download with the Word file icon
        let titled = Selector::parse(r#"a[title*="Tải xuống"]"#).ok()?;
        let icon = Selector::parse("i.fa-file-word-o").ok()?;
        for anchor in document.select(&titled) {
            if anchor.select(&icon).next().is_some()
                && let Some(href) = anchor.value().attr("href")
            {
                return Some(href.to_string());
            }
        }

        // Strategy 2: any anchor wrapping the Word file icon
        let any_anchor = Selector::parse("a").ok()?;
        for anchor in document.select(&any_anchor) {
            if anchor.select(&icon).next().is_some()
                && let Some(href) = anchor.value().attr("href")
            {
                return Some(href.to_string());
            }
        }

        // Strategy 3: any .doc-looking href. Matched in Rust on the
        // lowercased value because the portal serves uppercase .DOC links
        // and attribute selectors compare case-sensitively.
        for anchor in document.select(&any_anchor) {
            if let Some(href) = anchor.value().attr("href")
                && href.to_ascii_lowercase().contains(".doc")
            {
                return Some(href.to_string());
            }
        }

        None
    }
}

#[async_trait]
impl GuideLinkLocator for HttpLinkLocator {
    async fn locate(&self, procedure: &ProcedureDescriptor) -> Result<Option<String>, LocateError> {
        let response = self
            .client
            .get(&procedure.detail_url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LocateError::Timeout
                } else {
                    LocateError::PageLoad(e.to_string())
                }
            })?;

        let body = response
            .text()
            .await
            .map_err(|e| LocateError::PageLoad(e.to_string()))?;

        let link = Self::find_link(&Html::parse_document(&body));
        if link.is_none() {
            debug!("No guide link on detail page for {}", procedure.code);
        }
        Ok(link)
    }
}
