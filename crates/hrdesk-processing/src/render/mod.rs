//! Artifact Renderer

pub mod layout;
pub mod pdf;
mod report;

pub use report::{humanize_key, kpi_cards, RenderMetadata, ReportRenderer};
