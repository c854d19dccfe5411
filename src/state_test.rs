use super::*;

#[tokio::test]
async fn new_state_has_no_persistence_and_default_tokens() {
    let state = test_helpers::test_app_state();
    assert!(state.save_tx.is_none());
    assert!(state.llm.is_none());
    assert_eq!(state.flowchart_max_tokens, DEFAULT_FLOWCHART_MAX_TOKENS);
    assert_eq!(*state.diagram.read().await, Diagram::default());
}

#[tokio::test]
async fn clones_share_the_diagram() {
    let state = test_helpers::test_app_state();
    let other = state.clone();
    test_helpers::seed_diagram(&other).await;
    assert_eq!(state.diagram.read().await.nodes.len(), 3);
}

#[test]
fn builders_set_fields() {
    let (tx, _rx) = mpsc::channel(1);
    let state = test_helpers::test_app_state()
        .with_save_tx(tx)
        .with_max_tokens(99);
    assert!(state.save_tx.is_some());
    assert_eq!(state.flowchart_max_tokens, 99);
}
