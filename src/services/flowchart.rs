//! Flowchart service: turn free text into laid-out diagram nodes and edges.
//!
//! DESIGN
//! ======
//! A submission runs in three steps:
//!
//! 1. ask the model for `Node "X" to Node "Y" with edge "Z"` lines
//! 2. lay the extracted graph out with the tree-layout engine
//! 3. merge the result into the live diagram and queue a save
//!
//! Only step 1 suspends, and it runs without the diagram lock. Submissions
//! are serialized by `AppState::submit_lock`; a second one arriving while
//! the first is still waiting on the model is rejected rather than queued.
//! Blank text short-circuits before any of this and changes nothing.

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::flowchart::parse::{edge_pairs, node_names};
use crate::flowchart::{ExtractedEdge, LayoutError, compute_positions, parse_edges};
use crate::llm::LlmChat;
use crate::llm::types::{LlmError, Message};
use crate::services::persistence;
use crate::state::AppState;

pub const SYSTEM_PROMPT: &str = "\
You convert a description of a process into a flowchart. \
Reply with one line per edge and nothing else, in exactly this form:
Node \"<from>\" to Node \"<to>\" with edge \"<label>\"
Use the same node name every time a step appears. \
Start from a single entry node that no edge points to. \
Express conditional branches as several edges leaving one decision node, \
with the condition as the edge label, and loops as an edge back to an earlier node. \
Leave the label empty (\"\") when an edge needs none. \
No numbering, bullets, headings, or explanations.";

#[derive(Debug, thiserror::Error)]
pub enum FlowchartError {
    #[error("LLM is not configured")]
    LlmNotConfigured,
    #[error("another flowchart submission is in progress")]
    Busy,
    #[error("edge extraction failed: {0}")]
    Llm(#[from] LlmError),
    #[error("the model reply contained no flowchart edges")]
    NoDiagram,
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl ErrorCode for FlowchartError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::LlmNotConfigured => "E_LLM_NOT_CONFIGURED",
            Self::Busy => "E_SUBMISSION_IN_FLIGHT",
            Self::Llm(_) => "E_EXTRACTION_FAILED",
            Self::NoDiagram => "E_NO_DIAGRAM",
            Self::Layout(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Busy => true,
            Self::Llm(e) => e.retryable(),
            _ => false,
        }
    }
}

/// What one submission did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    pub submission_id: Uuid,
    pub edges_extracted: usize,
    pub nodes_added: usize,
    pub edges_added: usize,
}

/// Ask the model for an edge list describing `text`.
///
/// Blank text returns an empty list without calling the model.
///
/// # Errors
///
/// Returns `FlowchartError::Llm` when the provider call fails.
pub async fn extract_edges(llm: &dyn LlmChat, text: &str, max_tokens: u32) -> Result<Vec<ExtractedEdge>, FlowchartError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let response = llm
        .chat(max_tokens, SYSTEM_PROMPT, &[Message::user(text.trim())])
        .await?;
    if response.stop_reason == "max_tokens" {
        warn!(max_tokens, "model reply truncated; trailing edges may be missing");
    }

    let reply = response.text();
    let edges = parse_edges(&reply);
    info!(
        model = %response.model,
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        lines = reply.lines().count(),
        edges = edges.len(),
        "edges extracted"
    );
    Ok(edges)
}

/// Run a full submission against the live diagram.
///
/// # Errors
///
/// `LlmNotConfigured` without a client, `Busy` while another submission
/// runs, `Llm` on provider failure, `NoDiagram` when the reply has no edge
/// lines, and `Layout` when the edges have no single root. On any error the
/// diagram is left untouched.
pub async fn submit_prompt(state: &AppState, text: &str) -> Result<SubmitOutcome, FlowchartError> {
    let submission_id = Uuid::new_v4();
    if text.trim().is_empty() {
        return Ok(SubmitOutcome { submission_id, edges_extracted: 0, nodes_added: 0, edges_added: 0 });
    }

    let Some(llm) = state.llm.clone() else {
        return Err(FlowchartError::LlmNotConfigured);
    };
    let Ok(_in_flight) = state.submit_lock.try_lock() else {
        warn!(%submission_id, "flowchart submission rejected; another is in flight");
        return Err(FlowchartError::Busy);
    };

    info!(%submission_id, chars = text.len(), "flowchart submission started");
    let edges = extract_edges(llm.as_ref(), text, state.flowchart_max_tokens).await?;
    if edges.is_empty() {
        warn!(%submission_id, "model reply had no usable edge lines");
        return Err(FlowchartError::NoDiagram);
    }

    let positions = compute_positions(&node_names(&edges), &edge_pairs(&edges), &state.layout).inspect_err(|e| {
        warn!(%submission_id, error = %e, "flowchart layout failed");
    })?;

    let summary = {
        let mut diagram = state.diagram.write().await;
        let summary = diagram.merge_layout(&edges, &positions, &mut rand::rng());
        persistence::enqueue_save(state, &diagram);
        summary
    };

    info!(
        %submission_id,
        edges_extracted = edges.len(),
        positioned = positions.len(),
        nodes_added = summary.nodes_added,
        edges_added = summary.edges_added,
        "flowchart merged"
    );
    Ok(SubmitOutcome {
        submission_id,
        edges_extracted: edges.len(),
        nodes_added: summary.nodes_added,
        edges_added: summary.edges_added,
    })
}

#[cfg(test)]
#[path = "flowchart_test.rs"]
mod tests;
