//! HTTP API Route Definitions

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, AppState};

/// Create the API router with all routes
pub fn create_router(app_state: AppState) -> Router {
    let api = Router::new()
        .route("/startIndexing", get(handlers::start_indexing))
        .route("/stopIndexing", get(handlers::stop_indexing))
        .route("/indexPage", post(handlers::index_page))
        .route("/statistics", get(handlers::statistics))
        .with_state(app_state);

    Router::new().nest("/api", api)
}
