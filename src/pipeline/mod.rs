//! Batch download pipeline for procedure guide documents.
//!
//! The orchestrator drains a procedure listing through a bounded worker
//! pool; each worker runs the cache-check / fetch / convert / annotate
//! sequence in [`worker`] and reports a terminal [`DownloadStatus`].

pub mod error_tracker;
pub mod link_locator;
pub mod orchestrator;
pub mod progress;
pub mod types;
pub mod worker;

pub use error_tracker::{ErrorCategory, ErrorTracker, TrackedError};
pub use link_locator::{GuideLinkLocator, HttpLinkLocator, LocateError, locate_with_retry};
pub use orchestrator::{DownloadPipeline, LocatorFactory};
pub use progress::{ConsoleProgress, NoOpProgress, PROGRESS_INTERVAL, ProgressReporter};
pub use types::{DownloadStatus, ProcedureDescriptor, ProcedureOutcome, RunStats, SharedStats};
pub use worker::{WorkerContext, process_procedure};
