//! Broadcast router: fan a frame out to a room.
//!
//! DESIGN
//! ======
//! Recipients are a snapshot of membership taken at call time. Delivery goes
//! through each connection's [`Outbox`](super::outbox::Outbox) and never blocks:
//! - A closed outbox means the socket task is gone; skipping it is correct.
//! - A full outbox drops best-effort frames (cursor, element, scene events).
//! - Membership frames (`user_joined`, `user_left`) ride a separate ordered
//!   queue, so they are never dropped and never overtake each other.

use frames::{ConnectionId, ServerMessage};
use tracing::debug;

use super::outbox::Delivery;
use super::room::RoomRegistry;

/// Deliver `message` to every member of `board_id` except `exclude`.
/// Returns how many recipients queued the frame.
pub async fn broadcast(
    rooms: &RoomRegistry,
    board_id: &str,
    message: &ServerMessage,
    exclude: Option<ConnectionId>,
) -> usize {
    let recipients = rooms.recipients(board_id, exclude).await;
    let mut delivered = 0;

    for (connection_id, outbox) in recipients {
        match outbox.deliver(message.clone()) {
            Delivery::Queued => delivered += 1,
            Delivery::Closed => {
                debug!(%connection_id, kind = message.kind(), "broadcast skipped closing connection");
            }
            Delivery::Dropped => {
                debug!(%connection_id, kind = message.kind(), "broadcast dropped under backpressure");
            }
        }
    }
    delivered
}

#[cfg(test)]
#[path = "broadcast_test.rs"]
mod tests;
