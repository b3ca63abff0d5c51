//! Sync responder: answer `sync_request` with the persisted scene.
//!
//! DESIGN
//! ======
//! The snapshot fetch can be slow, so it runs on its own task and the reply
//! goes straight into the requester's outbound channel. Nothing else in the
//! room sees it.
//!
//! POLICY
//! ======
//! A board with no stored snapshot gets no reply at all, and neither does a
//! failed fetch. Requesters apply their own timeout and treat silence as an
//! empty board.

use frames::{ConnectionId, ServerMessage};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::collab::SnapshotStore;
use crate::state::AppState;

/// Fetch the authoritative snapshot for a board, logging collaborator failures.
pub async fn respond(store: &dyn SnapshotStore, board_id: &str) -> Option<Value> {
    match store.fetch_snapshot(board_id).await {
        Ok(Some(scene_data)) => Some(scene_data),
        Ok(None) => {
            debug!(%board_id, "sync: no stored snapshot; request dropped");
            None
        }
        Err(e) => {
            warn!(error = %e, %board_id, "sync: snapshot fetch failed; request dropped");
            None
        }
    }
}

/// Run [`respond`] in the background and deliver the result to one requester.
pub fn spawn_sync_reply(
    state: &AppState,
    board_id: String,
    connection_id: ConnectionId,
    reply_tx: mpsc::Sender<ServerMessage>,
) -> JoinHandle<()> {
    let store = state.snapshots.clone();
    tokio::spawn(async move {
        let Some(scene_data) = respond(store.as_ref(), &board_id).await else {
            return;
        };
        if reply_tx.send(ServerMessage::SyncResponse { scene_data }).await.is_err() {
            debug!(%connection_id, %board_id, "sync: requester gone before reply");
        }
    })
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
