//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The JSON API under `/api` is what the browser diagram widget talks to.
//! Everything else falls through to the widget's static assets.

pub mod diagram;
pub mod flowchart;

use std::path::Path;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// API routes only.
pub fn api_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/diagram", get(diagram::get_diagram).delete(diagram::clear_diagram))
        .route("/api/nodes", post(diagram::create_node))
        .route("/api/nodes/{id}", patch(diagram::update_node).delete(diagram::delete_node))
        .route("/api/edges", post(diagram::create_edge))
        .route("/api/edges/{id}", patch(diagram::update_edge).delete(diagram::delete_edge))
        .route("/api/flowchart", post(flowchart::submit))
        .route("/api/export.png", get(diagram::export_png))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API routes plus the widget's static files.
pub fn app(state: AppState, static_dir: &Path) -> Router {
    let widget = ServeDir::new(static_dir).append_index_html_on_directories(true);
    api_routes(state).fallback_service(widget)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
