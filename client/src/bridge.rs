//! Scene bridge: wire local edits and hub events to an external scene.
//!
//! DESIGN
//! ======
//! The rendering engine owns the scene; the bridge only sees it through
//! [`Scene`]. Outbound frames go through an [`EventSink`], which a running
//! [`SessionHandle`] implements.
//!
//! Two entry points, two rules:
//! - [`SceneBridge::local_edit`]: the host reports a change it already made.
//!   Echoes of a remote apply are dropped; anything else is committed to
//!   history and sent.
//! - [`SceneBridge::apply_remote`]: a hub frame. The target id is marked in
//!   the echo suppressor before the scene is touched, and nothing is
//!   committed or sent.
//!
//! Undo and redo replace the whole scene with a stored snapshot. They never
//! commit and never send; history is local to this client.

use frames::{ClientMessage, ServerMessage};
use serde_json::Value;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::echo::EchoSuppressor;
use crate::history::History;
use crate::session::SessionHandle;

/// Echo key used for whole-scene replacements (clear and sync load).
pub const SCENE_ECHO_KEY: &str = "\u{0}scene";

/// The local scene as the bridge needs it.
pub trait Scene {
    type Snapshot: Clone;

    fn snapshot(&self) -> Self::Snapshot;
    fn restore(&mut self, snapshot: &Self::Snapshot);

    fn apply_added(&mut self, element_id: &str, element_data: &Value);
    fn apply_modified(&mut self, element_id: &str, element_data: &Value);
    fn apply_removed(&mut self, element_id: &str);
    fn clear(&mut self);
    /// Replace the scene with a document from `sync_response`.
    fn load(&mut self, scene_data: &Value);
}

/// Outbound side of a session.
pub trait EventSink {
    /// Fire-and-forget. Returns `false` if the frame could not be queued.
    fn send(&self, message: ClientMessage) -> bool;
}

impl EventSink for SessionHandle {
    fn send(&self, message: ClientMessage) -> bool {
        SessionHandle::send(self, message)
    }
}

/// A change the user made to the local scene.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalEdit {
    Added { element_id: String, element_data: Value },
    Modified { element_id: String, element_data: Value },
    Removed { element_id: String },
    Cleared,
}

impl LocalEdit {
    fn echo_key(&self) -> &str {
        match self {
            Self::Added { element_id, .. } | Self::Modified { element_id, .. } | Self::Removed { element_id } => {
                element_id
            }
            Self::Cleared => SCENE_ECHO_KEY,
        }
    }

    fn into_message(self) -> ClientMessage {
        match self {
            Self::Added { element_id, element_data } => ClientMessage::ElementAdded { element_id, element_data },
            Self::Modified { element_id, element_data } => ClientMessage::ElementModified { element_id, element_data },
            Self::Removed { element_id } => ClientMessage::ElementRemoved { element_id },
            Self::Cleared => ClientMessage::SceneCleared,
        }
    }
}

/// What [`SceneBridge::local_edit`] did with an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Committed to history and handed to the sink.
    Sent,
    /// Committed, but the sink refused the frame.
    Unsent,
    /// Echo of a remote apply; ignored.
    Suppressed,
}

pub struct SceneBridge<S: Scene, K: EventSink, C: Clock = SystemClock> {
    scene: S,
    sink: K,
    echo: EchoSuppressor<C>,
    history: History<S::Snapshot>,
}

impl<S: Scene, K: EventSink> SceneBridge<S, K> {
    /// Bridge with the default echo window and history capacity.
    pub fn new(scene: S, sink: K) -> Self {
        Self::with_parts(scene, sink, EchoSuppressor::new(), History::new())
    }
}

impl<S: Scene, K: EventSink, C: Clock> SceneBridge<S, K, C> {
    /// Assemble a bridge from its parts. The current scene becomes the first
    /// history entry so the first edit can be undone.
    pub fn with_parts(scene: S, sink: K, echo: EchoSuppressor<C>, mut history: History<S::Snapshot>) -> Self {
        history.clear();
        history.commit(scene.snapshot());
        Self { scene, sink, echo, history }
    }

    pub fn local_edit(&mut self, edit: LocalEdit) -> EditOutcome {
        if self.echo.observe_local(edit.echo_key()) {
            debug!(key = edit.echo_key(), "bridge: echo suppressed");
            return EditOutcome::Suppressed;
        }
        self.history.commit(self.scene.snapshot());
        if self.sink.send(edit.into_message()) { EditOutcome::Sent } else { EditOutcome::Unsent }
    }

    /// Apply a hub frame to the scene. Returns `false` for frames that do
    /// not touch the scene.
    pub fn apply_remote(&mut self, message: &ServerMessage) -> bool {
        let echo_key = match message {
            ServerMessage::SceneCleared { .. } | ServerMessage::SyncResponse { .. } => SCENE_ECHO_KEY,
            other => match other.element_id() {
                Some(element_id) => element_id,
                None => return false,
            },
        };
        self.echo.mark_applying(echo_key);

        match message {
            ServerMessage::ElementAdded { element_id, element_data, .. } => {
                self.scene.apply_added(element_id, element_data);
            }
            ServerMessage::ElementModified { element_id, element_data, .. } => {
                self.scene.apply_modified(element_id, element_data);
            }
            ServerMessage::ElementRemoved { element_id, .. } => self.scene.apply_removed(element_id),
            ServerMessage::SceneCleared { .. } => self.scene.clear(),
            ServerMessage::SyncResponse { scene_data } => {
                self.scene.load(scene_data);
                self.history.clear();
                self.history.commit(self.scene.snapshot());
            }
            _ => {}
        }
        true
    }

    /// Step back one entry. Returns `false` at the oldest entry.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(entry) => {
                self.scene.restore(&entry.snapshot);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(entry) => {
                self.scene.restore(&entry.snapshot);
                true
            }
            None => false,
        }
    }

    /// Drop expired echo marks.
    pub fn sweep(&mut self) -> usize {
        self.echo.sweep()
    }

    #[must_use]
    pub fn scene(&self) -> &S {
        &self.scene
    }

    #[must_use]
    pub fn history(&self) -> &History<S::Snapshot> {
        &self.history
    }

    #[must_use]
    pub fn echo(&self) -> &EchoSuppressor<C> {
        &self.echo
    }

    #[must_use]
    pub fn sink(&self) -> &K {
        &self.sink
    }
}

#[cfg(test)]
#[path = "bridge_test.rs"]
mod tests;
