//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the room registry (the only shared mutable state in the hub)
//! and the three external collaborators behind trait objects.

use std::sync::Arc;

use crate::config::DEFAULT_CLIENT_CHANNEL_CAPACITY;
use crate::services::collab::{BoardDirectory, IdentityVerifier, SnapshotStore};
use crate::services::room::RoomRegistry;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomRegistry,
    pub identity: Arc<dyn IdentityVerifier>,
    pub boards: Arc<dyn BoardDirectory>,
    pub snapshots: Arc<dyn SnapshotStore>,
    /// Capacity of each connection's outbound frame channel.
    pub client_channel_capacity: usize,
}

impl AppState {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityVerifier>,
        boards: Arc<dyn BoardDirectory>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            rooms: RoomRegistry::new(),
            identity,
            boards,
            snapshots,
            client_channel_capacity: DEFAULT_CLIENT_CHANNEL_CAPACITY,
        }
    }

    #[must_use]
    pub fn with_client_channel_capacity(mut self, capacity: usize) -> Self {
        self.client_channel_capacity = capacity.max(1);
        self
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::services::collab::{CollabError, Identity};

    /// In-memory stand-in for every external collaborator.
    #[derive(Default)]
    pub struct MemoryCollaborators {
        pub tokens: Mutex<HashMap<String, Identity>>,
        pub boards: Mutex<HashSet<String>>,
        pub snapshots: Mutex<HashMap<String, Value>>,
        /// When set, every call fails as if the backing store were down.
        pub fail: Mutex<bool>,
        /// Artificial latency for snapshot fetches.
        pub snapshot_delay: Mutex<Option<std::time::Duration>>,
    }

    impl MemoryCollaborators {
        pub fn with_user(self, token: &str, user_id: &str, name: &str) -> Self {
            self.tokens.lock().expect("tokens mutex").insert(
                token.to_owned(),
                Identity { user_id: user_id.to_owned(), display_name: name.to_owned(), avatar_url: None },
            );
            self
        }

        pub fn with_board(self, board_id: &str) -> Self {
            self.boards.lock().expect("boards mutex").insert(board_id.to_owned());
            self
        }

        pub fn with_snapshot(self, board_id: &str, scene: Value) -> Self {
            self.snapshots.lock().expect("snapshots mutex").insert(board_id.to_owned(), scene);
            self
        }

        fn check(&self) -> Result<(), CollabError> {
            if *self.fail.lock().expect("fail mutex") {
                return Err(CollabError::Unavailable("memory store offline".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl IdentityVerifier for MemoryCollaborators {
        async fn verify_identity(&self, token: &str) -> Result<Option<Identity>, CollabError> {
            self.check()?;
            Ok(self.tokens.lock().expect("tokens mutex").get(token).cloned())
        }
    }

    #[async_trait]
    impl BoardDirectory for MemoryCollaborators {
        async fn board_exists(&self, board_id: &str) -> Result<bool, CollabError> {
            self.check()?;
            Ok(self.boards.lock().expect("boards mutex").contains(board_id))
        }
    }

    #[async_trait]
    impl SnapshotStore for MemoryCollaborators {
        async fn fetch_snapshot(&self, board_id: &str) -> Result<Option<Value>, CollabError> {
            let delay = *self.snapshot_delay.lock().expect("delay mutex");
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.check()?;
            Ok(self.snapshots.lock().expect("snapshots mutex").get(board_id).cloned())
        }
    }

    pub const TEST_BOARD: &str = "board-x";

    /// Collaborators with two users (`token-a`, `token-b`) and one board.
    #[must_use]
    pub fn default_collaborators() -> MemoryCollaborators {
        MemoryCollaborators::default()
            .with_user("token-a", "user-a", "Alice")
            .with_user("token-b", "user-b", "Bob")
            .with_board(TEST_BOARD)
    }

    /// Build an `AppState` where one object plays all three collaborator roles.
    #[must_use]
    pub fn test_app_state_with(collab: MemoryCollaborators) -> (AppState, Arc<MemoryCollaborators>) {
        let collab = Arc::new(collab);
        let state = AppState::new(collab.clone(), collab.clone(), collab.clone());
        (state, collab)
    }

    #[must_use]
    pub fn test_app_state() -> AppState {
        test_app_state_with(default_collaborators()).0
    }
}
