//! Shared message model and JSON codec for the realtime board transport.
//!
//! This crate owns the wire representation used by both `server` and `client`.
//! Every frame is one JSON object discriminated by a `type` field. Element
//! and scene payloads stay opaque (`serde_json::Value`); the hub relays them
//! without looking inside.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Ephemeral identifier of one transport session (not one user).
pub type ConnectionId = Uuid;

// =============================================================================
// ERRORS
// =============================================================================

/// Error returned by [`decode_client`] and [`decode_server`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame text is not valid JSON.
    #[error("invalid json: {0}")]
    InvalidJson(#[source] serde_json::Error),
    /// The frame is JSON but carries no string `type` field.
    #[error("missing message type")]
    MissingType,
    /// The `type` field names a message kind this side does not accept.
    #[error("unknown message type: {0}")]
    UnknownType(String),
    /// The `type` is known but the remaining fields do not match it.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    /// A message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Grepable error code and retryable flag for structured `error` frames.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// PRESENCE
// =============================================================================

/// A point in scene coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub x: f64,
    pub y: f64,
}

/// Broadcastable view of one connection. Carries no transport handle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub connection_id: ConnectionId,
    pub user_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Display color (hex).
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<CursorPosition>,
    /// Milliseconds since the Unix epoch of the last processed frame.
    pub last_seen: i64,
}

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

/// Frames a client sends to the hub.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Join { board_id: String, token: String },
    Leave,
    CursorMove { position: CursorPosition },
    ElementAdded { element_id: String, element_data: Value },
    ElementModified { element_id: String, element_data: Value },
    ElementRemoved { element_id: String },
    SceneCleared,
    SyncRequest,
}

impl ClientMessage {
    /// Every `type` tag a client may send.
    pub const KINDS: &'static [&'static str] = &[
        "join",
        "leave",
        "cursor_move",
        "element_added",
        "element_modified",
        "element_removed",
        "scene_cleared",
        "sync_request",
    ];

    /// Wire tag of this message.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave => "leave",
            Self::CursorMove { .. } => "cursor_move",
            Self::ElementAdded { .. } => "element_added",
            Self::ElementModified { .. } => "element_modified",
            Self::ElementRemoved { .. } => "element_removed",
            Self::SceneCleared => "scene_cleared",
            Self::SyncRequest => "sync_request",
        }
    }
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

/// Frames the hub sends to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Joined {
        board_id: String,
        connection_id: ConnectionId,
        presence_list: Vec<Presence>,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retryable: Option<bool>,
    },
    UserJoined {
        presence: Presence,
    },
    UserLeft {
        connection_id: ConnectionId,
    },
    CursorUpdate {
        connection_id: ConnectionId,
        position: CursorPosition,
    },
    ElementAdded {
        connection_id: ConnectionId,
        user_id: String,
        element_id: String,
        element_data: Value,
    },
    ElementModified {
        connection_id: ConnectionId,
        user_id: String,
        element_id: String,
        element_data: Value,
    },
    ElementRemoved {
        connection_id: ConnectionId,
        user_id: String,
        element_id: String,
    },
    SceneCleared {
        connection_id: ConnectionId,
        user_id: String,
    },
    SyncResponse {
        scene_data: Value,
    },
}

impl ServerMessage {
    /// Every `type` tag the hub may send.
    pub const KINDS: &'static [&'static str] = &[
        "joined",
        "error",
        "user_joined",
        "user_left",
        "cursor_update",
        "element_added",
        "element_modified",
        "element_removed",
        "scene_cleared",
        "sync_response",
    ];

    /// Plain error frame without a code.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into(), code: None, retryable: None }
    }

    /// Structured error frame from a typed error.
    #[must_use]
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::Error {
            message: err.to_string(),
            code: Some(err.error_code().to_owned()),
            retryable: Some(err.retryable()),
        }
    }

    /// Wire tag of this message.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Joined { .. } => "joined",
            Self::Error { .. } => "error",
            Self::UserJoined { .. } => "user_joined",
            Self::UserLeft { .. } => "user_left",
            Self::CursorUpdate { .. } => "cursor_update",
            Self::ElementAdded { .. } => "element_added",
            Self::ElementModified { .. } => "element_modified",
            Self::ElementRemoved { .. } => "element_removed",
            Self::SceneCleared { .. } => "scene_cleared",
            Self::SyncResponse { .. } => "sync_response",
        }
    }

    /// Membership frames must reach every peer; everything else is best-effort.
    #[must_use]
    pub fn is_membership(&self) -> bool {
        matches!(self, Self::UserJoined { .. } | Self::UserLeft { .. })
    }

    /// Element id targeted by an element event, if any.
    #[must_use]
    pub fn element_id(&self) -> Option<&str> {
        match self {
            Self::ElementAdded { element_id, .. }
            | Self::ElementModified { element_id, .. }
            | Self::ElementRemoved { element_id, .. } => Some(element_id),
            _ => None,
        }
    }
}

// =============================================================================
// CODEC
// =============================================================================

/// Encode any message as one JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode<T: Serialize>(message: &T) -> Result<String, CodecError> {
    serde_json::to_string(message).map_err(CodecError::Encode)
}

/// Decode a frame received by the hub.
///
/// # Errors
///
/// Returns a [`CodecError`] describing why the frame was rejected.
pub fn decode_client(text: &str) -> Result<ClientMessage, CodecError> {
    decode_tagged(text, ClientMessage::KINDS)
}

/// Decode a frame received by a client.
///
/// # Errors
///
/// Returns a [`CodecError`] describing why the frame was rejected.
pub fn decode_server(text: &str) -> Result<ServerMessage, CodecError> {
    decode_tagged(text, ServerMessage::KINDS)
}

/// Two-step decode so an unknown tag is reported as such instead of as a
/// generic serde variant error.
fn decode_tagged<T: DeserializeOwned>(text: &str, known: &[&str]) -> Result<T, CodecError> {
    let value: Value = serde_json::from_str(text).map_err(CodecError::InvalidJson)?;
    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return Err(CodecError::MissingType);
    };
    if !known.contains(&kind) {
        return Err(CodecError::UnknownType(kind.to_owned()));
    }
    let kind = kind.to_owned();
    serde_json::from_value(value).map_err(|source| CodecError::InvalidPayload { kind, source })
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
