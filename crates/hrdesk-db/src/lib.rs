//! hrdesk database layer
//!
//! `db` holds the PostgreSQL repositories; `memory` holds in-process
//! implementations of the same traits for tests and local development.

pub mod db;
pub mod memory;

pub use db::*;
