//! Report aggregation and rendering
//!
//! `aggregate` turns HR records into summary, breakdowns and detail rows for one
//! report type. `registry` maps each [`ReportType`](hrdesk_core::models::ReportType)
//! to its aggregator and table layout. `render` lays the result out as a
//! paginated PDF and streams it to any async writer.

pub mod aggregate;
pub mod error;
pub mod registry;
pub mod render;

pub use aggregate::{
    AggregatedReportData, Breakdown, DetailRow, ReportAggregator, ReportQuery, Summary,
    MAX_DETAIL_ROWS,
};
pub use error::ReportError;
pub use registry::{report_definition, Column, ReportDefinition};
pub use render::{RenderMetadata, ReportRenderer};
