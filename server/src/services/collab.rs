//! External collaborators consumed by the hub.
//!
//! SYSTEM CONTEXT
//! ==============
//! Credential issuance, board ownership, and scene persistence live outside
//! the realtime hub. The gateway reaches them only through these three narrow
//! traits so tests can swap in memory fakes and production can use Postgres.

use async_trait::async_trait;
use serde_json::Value;

/// Failure talking to a collaborator. Distinct from a negative answer.
#[derive(Debug, thiserror::Error)]
pub enum CollabError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Identity resolved from a join credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Resolve a credential token. `Ok(None)` means bad or expired.
    async fn verify_identity(&self, token: &str) -> Result<Option<Identity>, CollabError>;
}

#[async_trait]
pub trait BoardDirectory: Send + Sync {
    async fn board_exists(&self, board_id: &str) -> Result<bool, CollabError>;
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Authoritative persisted scene for a board. `Ok(None)` when nothing is stored.
    async fn fetch_snapshot(&self, board_id: &str) -> Result<Option<Value>, CollabError>;
}
