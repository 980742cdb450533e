use crate::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(crate::api::handlers::analyze::health))
        .route("/api/analyze", post(crate::api::handlers::analyze::analyze))
        .route(
            "/api/analyze/stream",
            post(crate::api::handlers::analyze::analyze_stream),
        )
        .route(
            "/api/analysis/{id}",
            get(crate::api::handlers::analyze::get_analysis),
        )
}
