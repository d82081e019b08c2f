use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use lmi_core::SearchQuery;
use lmi_market::{snapshot_csv, SearchError};
use serde::Deserialize;
use serde_json::Value;

use super::{map_search_error, ApiError, ApiResponse, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct SearchBody {
    #[serde(flatten)]
    query: SearchQuery,
    /// Request narrative commentary alongside the analysis.
    #[serde(default)]
    insights: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct AnalyzeBody {
    #[serde(flatten)]
    query: SearchQuery,
    /// Raw scrape records as the provider returned them.
    records: Vec<Value>,
}

/// Turns a body that does not deserialize into the JSON error envelope.
fn json_body<T>(
    request_id: &str,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        ApiError::new(request_id, "validation_error", rejection.body_text())
    })
}

pub(super) async fn search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<SearchBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = req_id.0;
    let body = json_body(&request_id, payload)?;
    // Checked before the scraper so an incomplete query is always a 400.
    if let Err(problems) = body.query.validate() {
        return Err(map_search_error(
            request_id,
            &SearchError::InputValidation(problems),
        ));
    }
    let Some(scraper) = state.scraper.as_deref() else {
        return Err(ApiError::new(
            request_id,
            "service_unavailable",
            "live search is disabled: APIFY_TOKEN is not configured",
        ));
    };

    let insight = if body.insights {
        if state.insight.is_none() {
            tracing::warn!(
                request_id = %request_id,
                "insights requested but GEMINI_API_KEY is not configured"
            );
        }
        state.insight.as_deref()
    } else {
        None
    };

    let outcome = state
        .pipeline
        .search(body.query, scraper, insight)
        .await
        .map_err(|e| map_search_error(request_id.clone(), &e))?;

    Ok(Json(ApiResponse::new(request_id, outcome)))
}

pub(super) async fn analyze(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<AnalyzeBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = req_id.0;
    let body = json_body(&request_id, payload)?;
    let outcome = state
        .pipeline
        .analyze(body.query, &body.records)
        .map_err(|e| map_search_error(request_id.clone(), &e))?;

    Ok(Json(ApiResponse::new(request_id, outcome)))
}

pub(super) async fn export_csv(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<AnalyzeBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = json_body(&req_id.0, payload)?;
    let outcome = state
        .pipeline
        .analyze(body.query, &body.records)
        .map_err(|e| map_search_error(req_id.0, &e))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"market.csv\"",
            ),
        ],
        snapshot_csv(&outcome.snapshot),
    )
        .into_response())
}
