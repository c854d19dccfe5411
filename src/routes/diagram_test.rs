use super::*;
use crate::diagram::{PALETTE_RED, RANDOM_PLACEMENT_EXTENT};
use crate::state::test_helpers;

async fn body_bytes(resp: Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

#[test]
fn diagram_error_maps_not_found_to_404() {
    let err = diagram_error_to_api(&DiagramError::NodeNotFound("x".into()));
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.code, "E_NODE_NOT_FOUND");

    let err = diagram_error_to_api(&DiagramError::EdgeNotFound("x-y".into()));
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.code, "E_EDGE_NOT_FOUND");
}

#[test]
fn diagram_error_maps_invalid_value_to_400() {
    let err = diagram_error_to_api(&DiagramError::InvalidValue("blank".into()));
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.code, "E_INVALID_VALUE");
    assert!(!err.retryable);
}

// =============================================================================
// NODES
// =============================================================================

#[tokio::test]
async fn create_untitled_node_is_numbered_and_placed_randomly() {
    let state = test_helpers::test_app_state();
    let (status, Json(node)) = create_node(State(state.clone()), Json(CreateNodeBody::default()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(node.id, "Node 1");
    assert_eq!(node.label(), "Node 1");
    assert!((0.0..RANDOM_PLACEMENT_EXTENT).contains(&node.position.x));
    assert!((0.0..RANDOM_PLACEMENT_EXTENT).contains(&node.position.y));

    let (_, Json(second)) = create_node(State(state.clone()), Json(CreateNodeBody::default()))
        .await
        .unwrap();
    assert_eq!(second.id, "Node 2");
    assert_eq!(state.diagram.read().await.nodes.len(), 2);
}

#[tokio::test]
async fn create_node_honors_requested_position() {
    let state = test_helpers::test_app_state();
    let body = CreateNodeBody { label: Some("  Review ".into()), x: Some(10.0), y: Some(20.0) };
    let (status, Json(node)) = create_node(State(state), Json(body)).await.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(node.id, "Review");
    assert_eq!(node.position, Position::new(10.0, 20.0));
}

#[tokio::test]
async fn create_existing_label_returns_existing_node() {
    let state = test_helpers::test_app_state();
    test_helpers::seed_diagram(&state).await;
    let body = CreateNodeBody { label: Some("Start".into()), x: Some(0.0), y: Some(0.0) };
    let (status, Json(node)) = create_node(State(state.clone()), Json(body)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(node.position, Position::new(200.0, 100.0));
    assert_eq!(state.diagram.read().await.nodes.len(), 3);
}

#[tokio::test]
async fn create_blank_label_is_rejected() {
    let state = test_helpers::test_app_state();
    let body = CreateNodeBody { label: Some("   ".into()), ..Default::default() };
    let err = create_node(State(state.clone()), Json(body)).await.unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.code, "E_INVALID_VALUE");
    assert!(state.diagram.read().await.nodes.is_empty());
}

#[tokio::test]
async fn update_node_changes_label_color_and_position() {
    let state = test_helpers::test_app_state();
    test_helpers::seed_diagram(&state).await;
    let body = UpdateNodeBody {
        label: Some("Begin".into()),
        color: Some(PALETTE_RED.into()),
        x: Some(5.0),
        y: None,
    };
    let Json(node) = update_node(State(state.clone()), Path("Start".into()), Json(body))
        .await
        .unwrap();
    assert_eq!(node.id, "Start");
    assert_eq!(node.label(), "Begin");
    assert_eq!(node.color(), Some(PALETTE_RED));
    assert_eq!(node.position, Position::new(5.0, 100.0));
}

#[tokio::test]
async fn update_node_with_blank_color_changes_nothing() {
    let state = test_helpers::test_app_state();
    test_helpers::seed_diagram(&state).await;
    let before = state.diagram.read().await.clone();
    let body = UpdateNodeBody { label: Some("Begin".into()), color: Some(" ".into()), ..Default::default() };
    let err = update_node(State(state.clone()), Path("Start".into()), Json(body))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(*state.diagram.read().await, before);
}

#[tokio::test]
async fn update_unknown_node_is_404() {
    let state = test_helpers::test_app_state();
    let err = update_node(State(state), Path("ghost".into()), Json(UpdateNodeBody::default()))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.code, "E_NODE_NOT_FOUND");
}

#[tokio::test]
async fn delete_node_removes_incident_edges() {
    let state = test_helpers::test_app_state();
    test_helpers::seed_diagram(&state).await;
    let status = delete_node(State(state.clone()), Path("Start".into())).await.unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let diagram = state.diagram.read().await;
    assert_eq!(diagram.nodes.len(), 2);
    assert!(diagram.edges.is_empty());
}

#[tokio::test]
async fn delete_unknown_node_is_404() {
    let state = test_helpers::test_app_state();
    let err = delete_node(State(state), Path("ghost".into())).await.unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// EDGES
// =============================================================================

#[tokio::test]
async fn create_edge_between_existing_nodes() {
    let state = test_helpers::test_app_state();
    test_helpers::seed_diagram(&state).await;
    let body = CreateEdgeBody { source: "A".into(), target: "B".into(), label: "then".into() };
    let (status, Json(edge)) = create_edge(State(state.clone()), Json(body)).await.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(edge.id, "A-B");
    assert_eq!(edge.label.as_deref(), Some("then"));

    let again = CreateEdgeBody { source: "A".into(), target: "B".into(), label: "other".into() };
    let (status, Json(edge)) = create_edge(State(state.clone()), Json(again)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edge.label.as_deref(), Some("then"));
    assert_eq!(state.diagram.read().await.edges.len(), 3);
}

#[tokio::test]
async fn create_edge_to_unknown_node_is_404() {
    let state = test_helpers::test_app_state();
    test_helpers::seed_diagram(&state).await;
    let body = CreateEdgeBody { source: "A".into(), target: "ghost".into(), label: String::new() };
    let err = create_edge(State(state.clone()), Json(body)).await.unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(state.diagram.read().await.edges.len(), 2);
}

#[tokio::test]
async fn update_edge_sets_and_clears_label() {
    let state = test_helpers::test_app_state();
    test_helpers::seed_diagram(&state).await;

    let Json(edge) = update_edge(State(state.clone()), Path("Start-B".into()), Json(UpdateEdgeBody { label: "no".into() }))
        .await
        .unwrap();
    assert_eq!(edge.label.as_deref(), Some("no"));

    let Json(edge) = update_edge(State(state.clone()), Path("Start-B".into()), Json(UpdateEdgeBody { label: String::new() }))
        .await
        .unwrap();
    assert!(edge.label.is_none());
}

#[tokio::test]
async fn edge_routes_report_unknown_edges() {
    let state = test_helpers::test_app_state();
    let err = update_edge(State(state.clone()), Path("x-y".into()), Json(UpdateEdgeBody { label: "l".into() }))
        .await
        .unwrap_err();
    assert_eq!(err.code, "E_EDGE_NOT_FOUND");
    let err = delete_edge(State(state), Path("x-y".into())).await.unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_edge_keeps_nodes() {
    let state = test_helpers::test_app_state();
    test_helpers::seed_diagram(&state).await;
    let status = delete_edge(State(state.clone()), Path("Start-A".into())).await.unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    let diagram = state.diagram.read().await;
    assert_eq!(diagram.edges.len(), 1);
    assert_eq!(diagram.nodes.len(), 3);
}

// =============================================================================
// DIAGRAM
// =============================================================================

#[tokio::test]
async fn get_and_clear_diagram() {
    let state = test_helpers::test_app_state();
    test_helpers::seed_diagram(&state).await;
    let Json(diagram) = get_diagram(State(state.clone())).await;
    assert_eq!(diagram.nodes.len(), 3);
    assert_eq!(diagram.edges.len(), 2);

    assert_eq!(clear_diagram(State(state.clone())).await, StatusCode::NO_CONTENT);
    let Json(diagram) = get_diagram(State(state)).await;
    assert!(diagram.nodes.is_empty());
    assert!(diagram.edges.is_empty());
}

#[tokio::test]
async fn mutations_queue_saves() {
    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    let state = test_helpers::test_app_state().with_save_tx(tx);
    create_node(State(state.clone()), Json(CreateNodeBody::default()))
        .await
        .unwrap();
    let saved = rx.recv().await.unwrap();
    assert_eq!(saved.nodes.len(), 1);

    clear_diagram(State(state)).await;
    let saved = rx.recv().await.unwrap();
    assert!(saved.nodes.is_empty());
}

#[tokio::test]
async fn export_is_a_png_attachment() {
    let state = test_helpers::test_app_state();
    test_helpers::seed_diagram(&state).await;
    let resp = export_png(State(state)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[CONTENT_TYPE], "image/png");
    assert_eq!(resp.headers()[CONTENT_DISPOSITION], "attachment; filename=\"flowchart.png\"");
    let bytes = body_bytes(resp).await;
    assert!(bytes.starts_with(b"\x89PNG"));
}

#[tokio::test]
async fn create_edge_returns_its_own_pair_when_ids_clash() {
    let state = test_helpers::test_app_state();
    for name in ["a-b", "c", "a", "b-c"] {
        let body = CreateNodeBody { label: Some(name.into()), x: Some(0.0), y: Some(0.0) };
        create_node(State(state.clone()), Json(body)).await.unwrap();
    }
    let first = CreateEdgeBody { source: "a-b".into(), target: "c".into(), label: String::new() };
    create_edge(State(state.clone()), Json(first)).await.unwrap();

    let second = CreateEdgeBody { source: "a".into(), target: "b-c".into(), label: String::new() };
    let (status, Json(edge)) = create_edge(State(state.clone()), Json(second)).await.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!((edge.source.as_str(), edge.target.as_str()), ("a", "b-c"));

    let status = delete_edge(State(state.clone()), Path(edge.id)).await.unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    let diagram = state.diagram.read().await;
    assert_eq!(diagram.edges.len(), 1);
    assert_eq!(diagram.edges[0].source, "a-b");
}
