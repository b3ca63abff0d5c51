//! Domain services used by the websocket gateway.
//!
//! ARCHITECTURE
//! ============
//! Service modules own room membership, fan-out, and collaborator access so
//! the route handler can stay focused on protocol translation.

pub mod board;
pub mod broadcast;
pub mod collab;
pub mod outbox;
pub mod postgres;
pub mod presence;
pub mod room;
pub mod sync;
