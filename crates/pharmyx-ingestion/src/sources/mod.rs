//! Literature source clients.

pub mod pubmed;

use async_trait::async_trait;
use pharmyx_common::{EntrezCredentials, FetchError};

use crate::models::PubmedArticle;

/// Search + per-article fetch against a bibliographic database.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Identifiers matching `query`, in relevance order, at most `max_results`.
    async fn search_ids(
        &self,
        query: &str,
        credentials: &EntrezCredentials,
        max_results: usize,
    ) -> pharmyx_common::Result<Vec<String>>;

    /// Full metadata for one identifier.
    async fn fetch_article(
        &self,
        pmid: &str,
        credentials: &EntrezCredentials,
    ) -> Result<PubmedArticle, FetchError>;
}
