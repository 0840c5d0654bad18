//! Application services used by the HTTP handlers

pub mod reports;

pub use reports::{filename_slug, ReportDownload, ReportService};
