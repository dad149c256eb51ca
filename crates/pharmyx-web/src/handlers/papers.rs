//! Paper search endpoint.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use pharmyx_common::{ArticleRecord, SearchRequest};
use pharmyx_ingestion::FetchOutcome;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, NO_INDUSTRY_PAPERS, NO_PAPERS_FOUND};
use crate::state::SharedState;

#[derive(Debug, Serialize, Deserialize)]
pub struct PapersResponse {
    pub papers: Vec<ArticleRecord>,
}

/// POST /api/fetch-papers - Search PubMed and keep industry-affiliated papers
pub async fn fetch_papers(
    State(state): State<SharedState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<PapersResponse>, ApiError> {
    let Json(request) = payload?;
    state.log_switch.apply(request.debug);
    request.validate().map_err(ApiError::Validation)?;

    info!("Starting paper fetch process");
    let credentials = request.credentials(&state.tool);
    let max_results = request.effective_max_results(state.max_results_cap);

    match state.fetcher.run(&request.query, &credentials, max_results).await {
        FetchOutcome::NoResults => Err(ApiError::NotFound(NO_PAPERS_FOUND.to_string())),
        FetchOutcome::NoMatches { searched } => {
            info!(searched, "No industry-affiliated papers");
            Err(ApiError::NotFound(NO_INDUSTRY_PAPERS.to_string()))
        }
        FetchOutcome::Papers(papers) => {
            info!(count = papers.len(), "Returning papers");
            Ok(Json(PapersResponse { papers }))
        }
    }
}
