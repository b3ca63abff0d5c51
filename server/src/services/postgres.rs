//! Postgres-backed collaborators.
//!
//! DESIGN
//! ======
//! Read-only queries against the application's `sessions`, `users`, and
//! `boards` tables. Board ids arrive as opaque strings; anything that is not
//! a UUID cannot name a stored board and short-circuits to "absent".

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::collab::{BoardDirectory, CollabError, Identity, IdentityVerifier, SnapshotStore};

#[derive(Clone)]
pub struct PgCollaborators {
    pool: PgPool,
}

impl PgCollaborators {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Display name fallback: the local part of the email address.
pub(crate) fn display_name_or_email(display_name: Option<String>, email: &str) -> String {
    match display_name {
        Some(name) if !name.trim().is_empty() => name,
        _ => email.split('@').next().unwrap_or(email).to_owned(),
    }
}

/// Column decode failures surface as errors rather than panics.
pub(crate) fn identity_from_row(row: &PgRow) -> Result<Identity, sqlx::Error> {
    let user_id: Uuid = row.try_get("id")?;
    let email: String = row.try_get("email")?;
    Ok(Identity {
        user_id: user_id.to_string(),
        display_name: display_name_or_email(row.try_get("display_name")?, &email),
        avatar_url: row.try_get("avatar_url")?,
    })
}

#[async_trait]
impl IdentityVerifier for PgCollaborators {
    async fn verify_identity(&self, token: &str) -> Result<Option<Identity>, CollabError> {
        let row = sqlx::query(
            r"SELECT u.id, u.email, u.display_name, u.avatar_url
              FROM sessions s
              JOIN users u ON u.id = s.user_id
              WHERE s.token = $1 AND s.expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(identity_from_row).transpose()?)
    }
}

#[async_trait]
impl BoardDirectory for PgCollaborators {
    async fn board_exists(&self, board_id: &str) -> Result<bool, CollabError> {
        let Ok(board_id) = board_id.parse::<Uuid>() else {
            return Ok(false);
        };
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM boards WHERE id = $1)")
            .bind(board_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl SnapshotStore for PgCollaborators {
    async fn fetch_snapshot(&self, board_id: &str) -> Result<Option<Value>, CollabError> {
        let Ok(board_id) = board_id.parse::<Uuid>() else {
            return Ok(None);
        };
        let data: Option<Option<Value>> = sqlx::query_scalar("SELECT canvas_data FROM boards WHERE id = $1")
            .bind(board_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(data.flatten())
    }
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;
