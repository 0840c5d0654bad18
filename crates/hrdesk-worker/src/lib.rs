//! Report job scheduling
//!
//! The runner executes one report generation under the per-report job lock,
//! the queue feeds it ids through a bounded channel and a worker pool, and
//! the reaper fails rows that were left GENERATING by a crash or a dropped
//! queue entry.

pub mod queue;
pub mod reaper;
pub mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use queue::{ReportJobQueue, ReportQueueConfig};
pub use reaper::{ReaperHandle, StaleReportReaper, STALE_REPORT_REASON};
pub use runner::{JobOutcome, ReportJobRunner, PDF_CONTENT_TYPE};
