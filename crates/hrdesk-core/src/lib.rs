//! hrdesk Core Library
//!
//! This crate provides core domain models, error types and configuration
//! shared across all hrdesk components.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{BaseConfig, Config, ReportServiceConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
