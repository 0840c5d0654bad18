//! hrdesk Storage Library
//!
//! This crate provides the durable artifact store used for rendered reports.
//! It includes the Storage trait and a local filesystem implementation.
//!
//! # Storage key format
//!
//! Report artifacts live under `reports/{report_id}.pdf`. Keys must not contain
//! `..` or a leading `/`. Key generation is centralized in the `keys` module.

pub mod factory;
pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::report_artifact_key;
pub use local::LocalStorage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
