//! Per-connection outbound queues.
//!
//! DESIGN
//! ======
//! Each socket task reads from two queues:
//! - `frames`: bounded. Cursor, element, scene and sync traffic. A full queue
//!   drops best-effort frames for that connection.
//! - `membership`: unbounded FIFO for `user_joined` / `user_left`. These
//!   never drop and never reorder relative to each other.
//!
//! [`Inbox::recv`] prefers the membership queue, so a peer's presence
//! changes are never stuck behind a backlog of scene traffic.

use frames::ServerMessage;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// What happened to one frame handed to [`Outbox::deliver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Best-effort frame dropped because the bounded queue is full.
    Dropped,
    /// The socket task is gone.
    Closed,
}

/// Sending side, held by the room registry and the connection's own session.
#[derive(Debug, Clone)]
pub struct Outbox {
    frames: mpsc::Sender<ServerMessage>,
    membership: mpsc::UnboundedSender<ServerMessage>,
}

/// Receiving side, owned by the socket task.
#[derive(Debug)]
pub struct Inbox {
    frames: mpsc::Receiver<ServerMessage>,
    membership: mpsc::UnboundedReceiver<ServerMessage>,
}

/// Create the queues for one connection. `capacity` bounds best-effort frames.
#[must_use]
pub fn outbox(capacity: usize) -> (Outbox, Inbox) {
    let (frames_tx, frames_rx) = mpsc::channel(capacity.max(1));
    let (membership_tx, membership_rx) = mpsc::unbounded_channel();
    (
        Outbox { frames: frames_tx, membership: membership_tx },
        Inbox { frames: frames_rx, membership: membership_rx },
    )
}

impl Outbox {
    /// Non-blocking delivery. Membership frames are always queued while the
    /// connection is open.
    pub fn deliver(&self, message: ServerMessage) -> Delivery {
        if message.is_membership() {
            return match self.membership.send(message) {
                Ok(()) => Delivery::Queued,
                Err(_) => Delivery::Closed,
            };
        }
        match self.frames.try_send(message) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Dropped,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Bounded queue for replies that should wait for room rather than drop.
    #[must_use]
    pub fn frames(&self) -> &mpsc::Sender<ServerMessage> {
        &self.frames
    }
}

impl Inbox {
    /// Next frame for the socket, membership first. `None` once every
    /// sender is gone. Cancel-safe.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        tokio::select! {
            biased;
            Some(msg) = self.membership.recv() => Some(msg),
            Some(msg) = self.frames.recv() => Some(msg),
            else => None,
        }
    }
}
