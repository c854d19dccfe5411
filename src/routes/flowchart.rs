//! Flowchart submission route.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use crate::error::ApiError;
use crate::flowchart::LayoutError;
use crate::services::flowchart::{self, FlowchartError, SubmitOutcome};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    #[serde(default)]
    pub text: String,
}

pub(crate) fn flowchart_error_to_api(err: &FlowchartError) -> ApiError {
    let status = match err {
        FlowchartError::LlmNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        FlowchartError::Busy => StatusCode::CONFLICT,
        FlowchartError::Llm(_) => StatusCode::BAD_GATEWAY,
        FlowchartError::Layout(LayoutError::InvalidConfig(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        FlowchartError::NoDiagram | FlowchartError::Layout(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    ApiError::new(status, err)
}

/// `POST /api/flowchart`: turn free text into diagram nodes and edges.
pub async fn submit(State(state): State<AppState>, Json(body): Json<SubmitBody>) -> Result<Json<SubmitOutcome>, ApiError> {
    flowchart::submit_prompt(&state, &body.text)
        .await
        .map(Json)
        .map_err(|e| flowchart_error_to_api(&e))
}

#[cfg(test)]
#[path = "flowchart_test.rs"]
mod tests;
