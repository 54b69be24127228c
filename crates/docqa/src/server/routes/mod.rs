//! API routes for the Q&A server

pub mod answer;
pub mod docs;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(answer_body_limit: usize) -> Router<AppState> {
    Router::new()
        // Document + questions upload, with a body limit sized for both files
        .route(
            "/answer",
            post(answer::answer_questions).layer(DefaultBodyLimit::max(answer_body_limit)),
        )
        .route("/docs", get(docs::docs_page))
        .route("/openapi.json", get(docs::openapi))
}
