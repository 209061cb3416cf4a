//! Acervo Common Library
//!
//! Shared code for the Acervo document repository services including:
//! - Database models and repository patterns
//! - Catalog filter engine
//! - Payload retrieval and file storage
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Metrics and observability

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod retrieval;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use auth::Principal;
pub use catalog::{CatalogParams, CatalogQuery, RecordFilter, Visibility};
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use storage::FileStorage;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
