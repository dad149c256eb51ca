//! Search → detail → filter pipeline for one request.
//!
//! Stage 1 asks the source for PMIDs. Stage 2 walks them strictly in order
//! and keeps only articles with an industry affiliation. Every outbound call,
//! search and fetch alike, takes a slot from the shared rate limiter first. A failed search is an empty result; a failed
//! fetch drops that one PMID and the loop carries on.

use std::sync::Arc;

use pharmyx_common::{ArticleRecord, EntrezCredentials, FetchError};
use tracing::{debug, error, info};

use crate::rate_limit::RateLimiter;
use crate::sources::ArticleSource;

/// What a full pipeline run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The search returned no PMIDs (or failed).
    NoResults,
    /// PMIDs were found but none had an industry affiliation.
    NoMatches { searched: usize },
    Papers(Vec<ArticleRecord>),
}

#[derive(Clone)]
pub struct PaperFetcher {
    source: Arc<dyn ArticleSource>,
    limiter: Arc<RateLimiter>,
}

impl PaperFetcher {
    pub fn new(source: Arc<dyn ArticleSource>, limiter: Arc<RateLimiter>) -> Self {
        Self { source, limiter }
    }

    /// Search stage. Waits for a rate-limit slot; errors are logged and
    /// reported as an empty list.
    pub async fn search(
        &self,
        query: &str,
        credentials: &EntrezCredentials,
        max_results: usize,
    ) -> Vec<String> {
        self.limiter.acquire().await;
        debug!(query, max_results, "Executing search");
        match self.source.search_ids(query, credentials, max_results).await {
            Ok(mut ids) => {
                ids.truncate(max_results);
                ids
            }
            Err(e) => {
                error!(query, error = %e, "Error fetching papers");
                Vec::new()
            }
        }
    }

    /// Fetch one PMID and reduce it to a record. Waits for a rate-limit slot first.
    pub async fn fetch_record(
        &self,
        pmid: &str,
        credentials: &EntrezCredentials,
    ) -> Result<ArticleRecord, FetchError> {
        self.limiter.acquire().await;
        debug!(pmid, "Fetching details");
        let article = self.source.fetch_article(pmid, credentials).await?;
        let record = article.to_record();
        match article.industry_author() {
            Some(author) => {
                if record.author_email == pharmyx_common::NOT_AVAILABLE {
                    debug!(pmid, "No email found");
                }
                debug!(pmid, author = %author.display_name(), "Industry affiliation found");
            }
            None => debug!(pmid, authors = article.authors.len(), "No industry affiliation"),
        }
        Ok(record)
    }

    /// Detail-and-filter stage over `pmids`, in order, one at a time.
    pub async fn fetch_details(
        &self,
        pmids: &[String],
        credentials: &EntrezCredentials,
    ) -> Vec<ArticleRecord> {
        let mut papers = Vec::new();
        for pmid in pmids {
            match self.fetch_record(pmid, credentials).await {
                Ok(record) if record.has_affiliation() => papers.push(record),
                Ok(_) => {
                    debug!(pmid = %pmid, "Skipping PMID due to no pharma/biotech affiliation");
                }
                Err(e) => {
                    error!(pmid = %pmid, kind = e.kind(), error = %e, "Error fetching details");
                }
            }
        }
        papers
    }

    pub async fn run(
        &self,
        query: &str,
        credentials: &EntrezCredentials,
        max_results: usize,
    ) -> FetchOutcome {
        let pmids = self.search(query, credentials, max_results).await;
        if pmids.is_empty() {
            return FetchOutcome::NoResults;
        }

        let papers = self.fetch_details(&pmids, credentials).await;
        info!(searched = pmids.len(), kept = papers.len(), "Paper fetch finished");
        if papers.is_empty() {
            FetchOutcome::NoMatches { searched: pmids.len() }
        } else {
            FetchOutcome::Papers(papers)
        }
    }
}
