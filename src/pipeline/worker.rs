//! Per-procedure processing: the CACHE_CHECK → FETCH → CONVERT → ANNOTATE
//! → CACHE_UPDATE state machine.
//!
//! One invocation owns one procedure from start to terminal status. All
//! failure paths resolve to a [`DownloadStatus`]; nothing a single
//! procedure does can abort the batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::annotate::append_source_link;
use crate::cache::{CacheEntry, ChecksumCache, compute_file_checksum, validate_existing_file};
use crate::config::PipelineConfig;
use crate::convert::{ConvertOutcome, DocConverter};
use crate::fetch::{DocumentFetcher, FetchError};
use crate::pipeline::error_tracker::{ErrorCategory, ErrorTracker};
use crate::pipeline::link_locator::{GuideLinkLocator, LocateError, locate_with_retry};
use crate::pipeline::types::{DownloadStatus, ProcedureDescriptor, ProcedureOutcome};
use crate::utils::guide_paths;

/// Shared services handed to each worker invocation.
///
/// Cache, converter and error tracker are shared services; the locator and
/// the fetcher inside are this worker's own sessions.
pub struct WorkerContext {
    pub config: Arc<PipelineConfig>,
    pub cache: Arc<ChecksumCache>,
    pub converter: Arc<DocConverter>,
    pub errors: Arc<ErrorTracker>,
}

/// Run one procedure to a terminal status.
pub async fn process_procedure<L: GuideLinkLocator + ?Sized>(
    ctx: &WorkerContext,
    locator: &L,
    procedure: &ProcedureDescriptor,
    ministry_folder: &Path,
) -> ProcedureOutcome {
    let status = match run_state_machine(ctx, locator, procedure, ministry_folder).await {
        Ok(status) => status,
        Err(e) => {
            let message = format!("{e:#}");
            warn!("[{}] unexpected error: {message}", procedure.code);
            ctx.errors.add_classified(&procedure.code, &message);
            DownloadStatus::OtherError
        }
    };

    ProcedureOutcome {
        code: procedure.code.clone(),
        status,
    }
}

async fn run_state_machine<L: GuideLinkLocator + ?Sized>(
    ctx: &WorkerContext,
    locator: &L,
    procedure: &ProcedureDescriptor,
    ministry_folder: &Path,
) -> anyhow::Result<DownloadStatus> {
    let guide_dir = ministry_folder.join(crate::utils::GUIDE_SUBDIR);
    tokio::fs::create_dir_all(&guide_dir).await?;

    let (doc_path, docx_path) = guide_paths(&guide_dir, &procedure.code);
    let cache_key = ChecksumCache::key(ministry_folder, &procedure.id);

    // CACHE_CHECK: the normalized file is preferred, the legacy file is
    // still acceptable when it validates.
    if !ctx.config.ignore_cache()
        && let Some(valid_path) =
            find_valid_cached_file(ctx, &cache_key, &docx_path, &doc_path).await
    {
        return finalize_cached(ctx, procedure, &cache_key, &valid_path).await;
    }

    // FETCH: locate the download link, then transfer bytes over this
    // worker's own HTTP session.
    let download_url = match locate_with_retry(locator, procedure).await {
        Ok(Some(url)) => url,
        Ok(None) => {
            warn!("[{}] no download link on detail page", procedure.code);
            return Ok(DownloadStatus::NoDownloadLink);
        }
        Err(LocateError::Timeout) => {
            ctx.errors
                .add(ErrorCategory::Timeout, &procedure.code, "detail page timed out");
            return Ok(DownloadStatus::TimeoutError);
        }
        Err(e) => {
            ctx.errors.add_classified(&procedure.code, &e.to_string());
            return Ok(DownloadStatus::OtherError);
        }
    };

    // A forced re-fetch must not be short-circuited by artifacts from an
    // earlier run. The transfer overwrites the legacy path itself, but a
    // leftover normalized sibling would win inside the converter, so it is
    // removed once the link is in hand.
    if ctx.config.ignore_cache()
        && docx_path.exists()
        && let Err(e) = tokio::fs::remove_file(&docx_path).await
    {
        warn!(
            "Cannot remove superseded file {}: {e}",
            docx_path.display()
        );
    }

    let fetcher = DocumentFetcher::with_policy(ctx.config.base_url(), ctx.config.retry_policy())?;
    if let Err(e) = fetcher.fetch(&download_url, &doc_path).await {
        let status = match &e {
            FetchError::Network(inner) if inner.is_timeout() => DownloadStatus::TimeoutError,
            _ => DownloadStatus::OtherError,
        };
        ctx.errors.add_classified(&procedure.code, &e.to_string());
        return Ok(status);
    }

    // CONVERT: graceful degradation, never fatal
    let outcome = ctx.converter.convert(&doc_path).await;
    let converted = matches!(outcome, ConvertOutcome::Converted(_));
    let file_path = outcome.into_path();

    // ANNOTATE: failure keeps the un-annotated file as the artifact
    let (final_path, status) = match append_source_link(&file_path, &procedure.detail_url).await {
        Some(annotated) => (annotated, DownloadStatus::Success),
        None => (file_path, DownloadStatus::SuccessDownloadOnly),
    };

    // CACHE_UPDATE: only now does the entry exist, so a crash before this
    // point leaves the procedure eligible for a fresh attempt next run.
    update_cache(ctx, procedure, &cache_key, &final_path).await?;

    if converted {
        info!("[{}] downloaded and converted", procedure.code);
    } else {
        info!("[{}] downloaded (kept legacy format)", procedure.code);
    }
    Ok(status)
}

/// Check the normalized then the legacy path against the cache entry,
/// deleting whichever file fails validation so the re-fetch starts clean.
async fn find_valid_cached_file(
    ctx: &WorkerContext,
    cache_key: &str,
    docx_path: &Path,
    doc_path: &Path,
) -> Option<PathBuf> {
    // An existing file without a cache entry validates on size alone,
    // matching entries written before checksums were recorded.
    let entry = ctx.cache.get(cache_key).unwrap_or(CacheEntry {
        code: String::new(),
        title: String::new(),
        downloaded: false,
        checksum: None,
        size: None,
    });

    for path in [docx_path, doc_path] {
        if !path.exists() {
            continue;
        }
        let path_owned = path.to_path_buf();
        let entry_clone = entry.clone();
        let verdict = tokio::task::spawn_blocking(move || {
            validate_existing_file(&path_owned, &entry_clone)
        })
        .await
        .ok()?;

        match verdict {
            Ok(()) => {
                debug!("Cache hit for {}", path.display());
                return Some(path.to_path_buf());
            }
            Err(reason) => {
                info!("{reason} for {}, re-downloading", path.display());
                if let Err(e) = tokio::fs::remove_file(path).await {
                    warn!("Cannot remove stale file {}: {e}", path.display());
                }
            }
        }
    }

    None
}

/// SKIP path: a valid cached file may still be a legacy `.doc` from an
/// earlier degraded run, so conversion and annotation are retried before
/// the entry is refreshed.
async fn finalize_cached(
    ctx: &WorkerContext,
    procedure: &ProcedureDescriptor,
    cache_key: &str,
    cached_path: &Path,
) -> anyhow::Result<DownloadStatus> {
    let outcome = ctx.converter.convert(cached_path).await;
    let file_path = outcome.into_path();

    let final_path = match append_source_link(&file_path, &procedure.detail_url).await {
        Some(annotated) => annotated,
        None => {
            warn!("[{}] could not annotate cached file", procedure.code);
            file_path
        }
    };

    update_cache(ctx, procedure, cache_key, &final_path).await?;
    Ok(DownloadStatus::Cached)
}

/// Fingerprint the final artifact and write the cache entry
async fn update_cache(
    ctx: &WorkerContext,
    procedure: &ProcedureDescriptor,
    cache_key: &str,
    final_path: &Path,
) -> anyhow::Result<()> {
    let checksum = compute_file_checksum(final_path).await?;
    let size = tokio::fs::metadata(final_path).await?.len();

    ctx.cache.put(
        cache_key.to_string(),
        CacheEntry {
            code: procedure.code.clone(),
            title: procedure.title.clone(),
            downloaded: true,
            checksum: Some(checksum),
            size: Some(size),
        },
    );
    Ok(())
}
