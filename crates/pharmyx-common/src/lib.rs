//! pharmyx-common — Shared types and errors used across all Pharmyx crates.

pub mod error;
pub mod models;

// Re-export commonly used types
pub use error::{FetchError, PharmyxError, Result};
pub use models::{ArticleRecord, EntrezCredentials, SearchRequest, NOT_AVAILABLE};
