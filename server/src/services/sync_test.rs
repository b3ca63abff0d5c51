use super::*;
use crate::state::test_helpers::{self, TEST_BOARD, default_collaborators, test_app_state_with};
use serde_json::json;
use tokio::time::{Duration, timeout};
use uuid::Uuid;

#[tokio::test]
async fn respond_returns_stored_scene() {
    let collab = default_collaborators().with_snapshot(TEST_BOARD, json!({"elements": [1, 2]}));
    let scene = respond(&collab, TEST_BOARD).await;
    assert_eq!(scene, Some(json!({"elements": [1, 2]})));
}

#[tokio::test]
async fn respond_without_snapshot_is_none() {
    let collab = default_collaborators();
    assert!(respond(&collab, TEST_BOARD).await.is_none());
}

#[tokio::test]
async fn respond_swallows_store_failure() {
    let collab = default_collaborators().with_snapshot(TEST_BOARD, json!({}));
    *collab.fail.lock().expect("fail mutex") = true;
    assert!(respond(&collab, TEST_BOARD).await.is_none());
}

#[tokio::test]
async fn spawned_reply_reaches_only_the_requester() {
    let (state, _collab) =
        test_app_state_with(default_collaborators().with_snapshot(TEST_BOARD, json!({"elements": []})));
    let (tx, mut rx) = mpsc::channel(4);

    spawn_sync_reply(&state, TEST_BOARD.into(), Uuid::new_v4(), tx).await.expect("task");

    let msg = timeout(Duration::from_millis(200), rx.recv()).await.expect("timed out").expect("closed");
    assert_eq!(msg, ServerMessage::SyncResponse { scene_data: json!({"elements": []}) });
}

#[tokio::test]
async fn missing_snapshot_sends_no_reply() {
    let state = test_helpers::test_app_state();
    let (tx, mut rx) = mpsc::channel(4);

    spawn_sync_reply(&state, TEST_BOARD.into(), Uuid::new_v4(), tx).await.expect("task");

    // Sender dropped with the finished task; nothing was queued.
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn requester_gone_before_reply_is_harmless() {
    let (state, _collab) = test_app_state_with(default_collaborators().with_snapshot(TEST_BOARD, json!({})));
    let (tx, rx) = mpsc::channel(4);
    drop(rx);

    spawn_sync_reply(&state, TEST_BOARD.into(), Uuid::new_v4(), tx).await.expect("task should not panic");
}
