//! Diagram editing and export routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use crate::diagram::{Diagram, DiagramError, Edge, Node, random_position, validate_name};
use crate::error::ApiError;
use crate::flowchart::Position;
use crate::services::export::{self, EXPORT_FILENAME};
use crate::services::persistence;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateNodeBody {
    pub label: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateNodeBody {
    pub label: Option<String>,
    pub color: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEdgeBody {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEdgeBody {
    #[serde(default)]
    pub label: String,
}

pub(crate) fn diagram_error_to_api(err: &DiagramError) -> ApiError {
    let status = match err {
        DiagramError::NodeNotFound(_) | DiagramError::EdgeNotFound(_) => StatusCode::NOT_FOUND,
        DiagramError::InvalidValue(_) => StatusCode::BAD_REQUEST,
    };
    ApiError::new(status, err)
}

fn node_or_404(diagram: &Diagram, id: &str) -> Result<Node, ApiError> {
    diagram
        .node(id)
        .cloned()
        .ok_or_else(|| diagram_error_to_api(&DiagramError::NodeNotFound(id.to_owned())))
}

fn edge_or_404(diagram: &Diagram, id: &str) -> Result<Edge, ApiError> {
    diagram
        .edge(id)
        .cloned()
        .ok_or_else(|| diagram_error_to_api(&DiagramError::EdgeNotFound(id.to_owned())))
}

/// `GET /api/diagram`: the whole diagram.
pub async fn get_diagram(State(state): State<AppState>) -> Json<Diagram> {
    Json(state.diagram.read().await.clone())
}

/// `DELETE /api/diagram`: remove every node and edge.
pub async fn clear_diagram(State(state): State<AppState>) -> StatusCode {
    let mut diagram = state.diagram.write().await;
    diagram.clear();
    persistence::enqueue_save(&state, &diagram);
    tracing::info!("diagram cleared");
    StatusCode::NO_CONTENT
}

/// `POST /api/nodes`: add a node. Without a label this is the "add node"
/// button: a numbered placeholder at a random spot. A label that already
/// exists returns the existing node with 200.
pub async fn create_node(
    State(state): State<AppState>,
    Json(body): Json<CreateNodeBody>,
) -> Result<(StatusCode, Json<Node>), ApiError> {
    let requested = match (body.x, body.y) {
        (Some(x), Some(y)) => Some(Position::new(x, y)),
        _ => None,
    };

    let mut diagram = state.diagram.write().await;
    let (name, created) = match body.label.as_deref() {
        Some(label) => {
            let name = validate_name(label).map_err(|e| diagram_error_to_api(&e))?;
            let position = requested.unwrap_or_else(|| random_position(&mut rand::rng()));
            (name.to_owned(), diagram.insert_node(name, position))
        }
        None => {
            let name = diagram.add_untitled_node(&mut rand::rng());
            if let Some(position) = requested {
                diagram
                    .move_node(&name, position)
                    .map_err(|e| diagram_error_to_api(&e))?;
            }
            (name, true)
        }
    };

    let node = node_or_404(&diagram, &name)?;
    if created {
        persistence::enqueue_save(&state, &diagram);
        tracing::info!(node = %name, "node created");
        Ok((StatusCode::CREATED, Json(node)))
    } else {
        Ok((StatusCode::OK, Json(node)))
    }
}

/// `PATCH /api/nodes/:id`: relabel, recolor, or move a node.
pub async fn update_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateNodeBody>,
) -> Result<Json<Node>, ApiError> {
    let mut diagram = state.diagram.write().await;
    let current = node_or_404(&diagram, &id)?;

    // Validate everything before touching the node.
    let label = body
        .label
        .as_deref()
        .map(validate_name)
        .transpose()
        .map_err(|e| diagram_error_to_api(&e))?;
    if body.color.as_deref().is_some_and(|c| c.trim().is_empty()) {
        return Err(diagram_error_to_api(&DiagramError::InvalidValue("color must not be empty".into())));
    }

    let apply = |diagram: &mut Diagram| -> Result<(), DiagramError> {
        if let Some(label) = label {
            diagram.update_node_label(&id, label)?;
        }
        if let Some(color) = body.color.as_deref() {
            diagram.update_node_color(&id, color)?;
        }
        if body.x.is_some() || body.y.is_some() {
            let position = Position::new(
                body.x.unwrap_or(current.position.x),
                body.y.unwrap_or(current.position.y),
            );
            diagram.move_node(&id, position)?;
        }
        Ok(())
    };
    apply(&mut diagram).map_err(|e| diagram_error_to_api(&e))?;

    persistence::enqueue_save(&state, &diagram);
    Ok(Json(node_or_404(&diagram, &id)?))
}

/// `DELETE /api/nodes/:id`: delete a node and its edges.
pub async fn delete_node(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let mut diagram = state.diagram.write().await;
    if !diagram.delete_node(&id) {
        return Err(diagram_error_to_api(&DiagramError::NodeNotFound(id)));
    }
    persistence::enqueue_save(&state, &diagram);
    tracing::info!(node = %id, "node deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/edges`: connect two existing nodes. An existing pair returns
/// the existing edge with 200.
pub async fn create_edge(
    State(state): State<AppState>,
    Json(body): Json<CreateEdgeBody>,
) -> Result<(StatusCode, Json<Edge>), ApiError> {
    let mut diagram = state.diagram.write().await;
    let created = diagram
        .connect(&body.source, &body.target, &body.label)
        .map_err(|e| diagram_error_to_api(&e))?;
    let edge = diagram
        .edge_between(&body.source, &body.target)
        .cloned()
        .ok_or_else(|| diagram_error_to_api(&DiagramError::EdgeNotFound(format!("{}->{}", body.source, body.target))))?;
    if created {
        persistence::enqueue_save(&state, &diagram);
        Ok((StatusCode::CREATED, Json(edge)))
    } else {
        Ok((StatusCode::OK, Json(edge)))
    }
}

/// `PATCH /api/edges/:id`: change or clear an edge label.
pub async fn update_edge(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateEdgeBody>,
) -> Result<Json<Edge>, ApiError> {
    let mut diagram = state.diagram.write().await;
    diagram
        .update_edge_label(&id, &body.label)
        .map_err(|e| diagram_error_to_api(&e))?;
    persistence::enqueue_save(&state, &diagram);
    Ok(Json(edge_or_404(&diagram, &id)?))
}

/// `DELETE /api/edges/:id`
pub async fn delete_edge(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let mut diagram = state.diagram.write().await;
    if !diagram.delete_edge(&id) {
        return Err(diagram_error_to_api(&DiagramError::EdgeNotFound(id)));
    }
    persistence::enqueue_save(&state, &diagram);
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/export.png`: the diagram as a PNG download.
pub async fn export_png(State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.diagram.read().await.clone();
    let nodes = snapshot.nodes.len();
    let png = export::export_png(snapshot).await.map_err(|e| {
        tracing::error!(error = %e, "diagram export failed");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, &e)
    })?;
    tracing::info!(nodes, bytes = png.len(), "diagram exported");

    Ok((
        [
            (CONTENT_TYPE, "image/png".to_owned()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{EXPORT_FILENAME}\"")),
        ],
        png,
    )
        .into_response())
}

#[cfg(test)]
#[path = "diagram_test.rs"]
mod tests;
