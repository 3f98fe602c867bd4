//! HTTP API Request Handlers
//!
//! Handlers that map HTTP requests to IndexingService operations.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Form, Json};
use tracing::{debug, error};

use crate::indexing::{IndexingService, ServiceError};

use super::types::*;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IndexingService>,
}

/// Start a full crawl campaign
pub async fn start_indexing(State(state): State<AppState>) -> impl IntoResponse {
    debug!("HTTP startIndexing request");
    match state.service.start() {
        Ok(()) => (StatusCode::OK, Json(IndexingResponse::ok())).into_response(),
        Err(e) => service_error_response(e),
    }
}

/// Stop the running crawl campaign
pub async fn stop_indexing(State(state): State<AppState>) -> impl IntoResponse {
    debug!("HTTP stopIndexing request");
    match state.service.stop() {
        Ok(()) => (StatusCode::OK, Json(IndexingResponse::ok())).into_response(),
        Err(e) => service_error_response(e),
    }
}

/// Fetch and index a single page
pub async fn index_page(
    State(state): State<AppState>,
    Form(request): Form<IndexPageRequest>,
) -> impl IntoResponse {
    debug!(url = %request.url, "HTTP indexPage request");
    match state.service.index_single_page(&request.url).await {
        Ok(()) => (StatusCode::OK, Json(IndexingResponse::ok())).into_response(),
        Err(e) => service_error_response(e),
    }
}

/// Aggregate and per-site statistics
pub async fn statistics(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.statistics() {
        Ok(report) => (
            StatusCode::OK,
            Json(StatisticsResponse {
                result: true,
                statistics: report,
            }),
        )
            .into_response(),
        Err(e) => service_error_response(e),
    }
}

/// Control errors are the caller's fault; everything else is a server-side
/// failure and is logged as such.
fn service_error_response(error: ServiceError) -> axum::response::Response {
    let status = match error {
        ServiceError::AlreadyRunning
        | ServiceError::NotRunning
        | ServiceError::OutsideConfiguredScope
        | ServiceError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        _ => {
            error!(error = %error, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(IndexingResponse::error(error.to_string()))).into_response()
}
