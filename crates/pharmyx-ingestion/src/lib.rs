//! pharmyx-ingestion — PubMed search, per-article fetch, and industry-affiliation filtering.
//!
//! Flow for one request:
//!   esearch (query → PMIDs) → for each PMID: rate-limit slot → efetch → parse → filter

pub mod affiliation;
pub mod models;
pub mod pipeline;
pub mod rate_limit;
pub mod sources;

pub use pipeline::{FetchOutcome, PaperFetcher};
pub use rate_limit::RateLimiter;
