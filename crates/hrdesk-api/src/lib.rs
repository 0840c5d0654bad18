//! hrdesk API Library
//!
//! HTTP handlers, application services and setup for the report service.

mod api_doc;
pub mod constants;
pub mod error;
mod handlers;
pub mod services;
pub mod setup;
pub mod state;
mod telemetry;

pub use error::ErrorResponse;
