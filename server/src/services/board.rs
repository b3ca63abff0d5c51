//! Board service: join/part orchestration.
//!
//! DESIGN
//! ======
//! Join resolves the credential and the board through the external
//! collaborators, admits the connection to the room registry, and announces
//! it to peers. Part removes it and announces the departure unless the room
//! closed with it. Both are safe to call from racing leave/close paths:
//! only the call that actually removed the connection broadcasts.

use frames::{ConnectionId, ErrorCode, Presence, ServerMessage};
use tracing::info;

use super::broadcast::broadcast;
use super::collab::CollabError;
use super::outbox::Outbox;
use super::presence::pick_color;
use super::room::{Connection, Departure};
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("Invalid or expired token")]
    AuthenticationFailure,
    #[error("Board not found")]
    NotFound(String),
    #[error("Service unavailable: {0}")]
    Unavailable(#[from] CollabError),
}

impl ErrorCode for BoardError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::AuthenticationFailure => "E_AUTH",
            Self::NotFound(_) => "E_BOARD_NOT_FOUND",
            Self::Unavailable(_) => "E_UNAVAILABLE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

// =============================================================================
// JOIN / PART
// =============================================================================

/// Authenticate and admit a connection to a board's room.
/// Returns the room's presence list including the new member.
///
/// # Errors
///
/// Returns [`BoardError::AuthenticationFailure`] for a rejected token,
/// [`BoardError::NotFound`] for an unknown board, and
/// [`BoardError::Unavailable`] if a collaborator call fails.
pub async fn join_board(
    state: &AppState,
    connection_id: ConnectionId,
    board_id: &str,
    token: &str,
    outbox: Outbox,
) -> Result<Vec<Presence>, BoardError> {
    let Some(identity) = state.identity.verify_identity(token).await? else {
        return Err(BoardError::AuthenticationFailure);
    };

    if !state.boards.board_exists(board_id).await? {
        return Err(BoardError::NotFound(board_id.to_owned()));
    }

    let connection = Connection::new(connection_id, identity, pick_color(), board_id.to_owned(), outbox);
    let presence = connection.presence();
    let admission = state.rooms.join(connection).await;

    if let Some(previous) = admission.previous {
        announce_departure(state, &previous).await;
    }

    let peers = broadcast(&state.rooms, board_id, &ServerMessage::UserJoined { presence }, Some(connection_id)).await;
    info!(%board_id, %connection_id, peers, "client joined board");
    Ok(admission.presence_list)
}

/// Remove a connection from its room. Idempotent: returns `None` and
/// broadcasts nothing if the connection was not a member.
pub async fn part_board(state: &AppState, connection_id: ConnectionId) -> Option<Departure> {
    let departure = state.rooms.leave(connection_id).await?;
    announce_departure(state, &departure).await;
    Some(departure)
}

async fn announce_departure(state: &AppState, departure: &Departure) {
    if departure.room_closed {
        return;
    }
    let msg = ServerMessage::UserLeft { connection_id: departure.connection_id };
    broadcast(&state.rooms, &departure.board_id, &msg, Some(departure.connection_id)).await;
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
