//! API constants

/// Versioned prefix for every report and notification route
pub const API_PREFIX: &str = "/api/v1";

/// Request bodies are small JSON documents
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Server-level cap on in-flight requests
pub const HTTP_CONCURRENCY_LIMIT: usize = 1024;
