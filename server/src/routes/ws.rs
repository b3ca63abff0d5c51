//! WebSocket handler: connection gateway for board rooms.
//!
//! DESIGN
//! ======
//! On upgrade, generates a connection ID and enters a `select!` loop:
//! - Incoming client frames → decode + dispatch by message type
//! - Frames queued by peers (broadcasts, sync replies) → forward to client,
//!   membership changes first
//! - Binary frames → `E_PROTOCOL` error, connection stays open
//!
//! Dispatch returns the frames meant for the sender plus a flow decision;
//! only the loop writes to the socket. This keeps the transport out of the
//! dispatch path so tests can drive it with plain strings.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → pending (no room)
//! 2. `join` → authenticate, admit, reply `joined`, peers get `user_joined`
//! 3. Room traffic → relayed to peers with the sender's identity stamped in
//! 4. `leave` → back to pending, transport stays open
//! 5. Close (clean or not) → part once, peers get `user_left`

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use frames::{ClientMessage, CodecError, ConnectionId, ErrorCode, ServerMessage};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::board::{self, BoardError};
use crate::services::broadcast::broadcast;
use crate::services::outbox::{Outbox, outbox};
use crate::services::sync::spawn_sync_reply;
use crate::state::AppState;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("Invalid message: {0}")]
    Protocol(#[from] CodecError),
    #[error("Binary frames are not supported")]
    BinaryFrame,
    #[error("Not joined to a board")]
    NotJoined,
}

impl GatewayError {
    /// Errors after which the hub closes the transport. Every failed join is
    /// terminal; a retryable one tells the client to reconnect later.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Board(_))
    }
}

impl ErrorCode for GatewayError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Board(e) => e.error_code(),
            Self::Protocol(_) | Self::BinaryFrame => "E_PROTOCOL",
            Self::NotJoined => "E_NOT_JOINED",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Board(e) => e.retryable(),
            Self::Protocol(_) | Self::BinaryFrame | Self::NotJoined => false,
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Per-socket gateway state.
struct Session {
    connection_id: ConnectionId,
    board_id: Option<String>,
    /// Sending side of this socket's own outbound queues.
    outbox: Outbox,
}

impl Session {
    fn new(connection_id: ConnectionId, outbox: Outbox) -> Self {
        Self { connection_id, board_id: None, outbox }
    }
}

/// Whether the loop keeps the transport open after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    let (client_outbox, mut inbox) = outbox(state.client_channel_capacity);
    let mut session = Session::new(connection_id, client_outbox);

    info!(%connection_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let (replies, flow) = process_inbound_text(&state, &mut session, &text).await;
                        if send_all(&mut socket, &replies).await.is_err() || flow == Flow::Close {
                            break;
                        }
                    }
                    Message::Binary(_) => {
                        warn!(%connection_id, "ws: binary frame rejected");
                        let reply = ServerMessage::error_from(&GatewayError::BinaryFrame);
                        if send_frame(&mut socket, &reply).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(msg) = inbox.recv() => {
                if send_frame(&mut socket, &msg).await.is_err() {
                    break;
                }
            }
        }
    }

    if session.board_id.take().is_some() {
        board::part_board(&state, connection_id).await;
    }
    let _ = socket.send(Message::Close(None)).await;
    info!(%connection_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Decode and process one inbound text frame. Returns the frames for the
/// sender and whether the transport should stay open.
async fn process_inbound_text(state: &AppState, session: &mut Session, text: &str) -> (Vec<ServerMessage>, Flow) {
    let connection_id = session.connection_id;
    let msg = match frames::decode_client(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(%connection_id, error = %e, "ws: invalid inbound frame");
            return (vec![ServerMessage::error_from(&GatewayError::Protocol(e))], Flow::Continue);
        }
    };

    if !matches!(msg, ClientMessage::CursorMove { .. }) {
        debug!(%connection_id, kind = msg.kind(), "ws: recv frame");
    }

    match dispatch(state, session, msg).await {
        Ok(replies) => (replies, Flow::Continue),
        Err(e) => {
            let flow = if e.is_terminal() { Flow::Close } else { Flow::Continue };
            warn!(%connection_id, code = e.error_code(), error = %e, ?flow, "ws: request failed");
            (vec![ServerMessage::error_from(&e)], flow)
        }
    }
}

async fn dispatch(state: &AppState, session: &mut Session, msg: ClientMessage) -> Result<Vec<ServerMessage>, GatewayError> {
    let connection_id = session.connection_id;

    match msg {
        ClientMessage::Join { board_id, token } => handle_join(state, session, board_id, &token).await,
        ClientMessage::Leave => {
            if session.board_id.take().is_some() {
                board::part_board(state, connection_id).await;
            }
            Ok(vec![])
        }
        room_msg => {
            let Some(board_id) = session.board_id.clone() else {
                return Err(GatewayError::NotJoined);
            };
            handle_room(state, session, &board_id, room_msg).await?;
            Ok(vec![])
        }
    }
}

async fn handle_join(
    state: &AppState,
    session: &mut Session,
    board_id: String,
    token: &str,
) -> Result<Vec<ServerMessage>, GatewayError> {
    let connection_id = session.connection_id;
    if session.board_id.take().is_some() {
        board::part_board(state, connection_id).await;
    }

    let presence_list = board::join_board(state, connection_id, &board_id, token, session.outbox.clone()).await?;
    session.board_id = Some(board_id.clone());
    Ok(vec![ServerMessage::Joined { board_id, connection_id, presence_list }])
}

/// Relay a room-scoped frame to peers with the sender's identity attached.
async fn handle_room(state: &AppState, session: &Session, board_id: &str, msg: ClientMessage) -> Result<(), GatewayError> {
    let connection_id = session.connection_id;
    let cursor = match &msg {
        ClientMessage::CursorMove { position } => Some(*position),
        _ => None,
    };
    let Some(sender) = state.rooms.touch(connection_id, cursor).await else {
        return Err(GatewayError::NotJoined);
    };
    let user_id = sender.identity.user_id;

    let outbound = match msg {
        ClientMessage::CursorMove { position } => ServerMessage::CursorUpdate { connection_id, position },
        ClientMessage::ElementAdded { element_id, element_data } => {
            ServerMessage::ElementAdded { connection_id, user_id, element_id, element_data }
        }
        ClientMessage::ElementModified { element_id, element_data } => {
            ServerMessage::ElementModified { connection_id, user_id, element_id, element_data }
        }
        ClientMessage::ElementRemoved { element_id } => ServerMessage::ElementRemoved { connection_id, user_id, element_id },
        ClientMessage::SceneCleared => ServerMessage::SceneCleared { connection_id, user_id },
        ClientMessage::SyncRequest => {
            spawn_sync_reply(state, board_id.to_owned(), connection_id, session.outbox.frames().clone());
            return Ok(());
        }
        ClientMessage::Join { .. } | ClientMessage::Leave => return Ok(()),
    };

    broadcast(&state.rooms, board_id, &outbound, Some(connection_id)).await;
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_all(socket: &mut WebSocket, messages: &[ServerMessage]) -> Result<(), ()> {
    for msg in messages {
        send_frame(socket, msg).await?;
    }
    Ok(())
}

async fn send_frame(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), ()> {
    let json = match frames::encode(msg) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    match msg {
        ServerMessage::CursorUpdate { .. } => {}
        ServerMessage::Error { message, code, .. } => {
            warn!(code = code.as_deref().unwrap_or("-"), message = %message, "ws: send frame type=error");
        }
        _ => debug!(kind = msg.kind(), "ws: send frame"),
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
