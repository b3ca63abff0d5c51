//! # client
//!
//! Native client for the realtime board hub.
//!
//! [`spawn_session`] runs the connection in a background task and hands back
//! a [`SessionHandle`] plus an event stream. [`SceneBridge`] sits between a
//! session and a host-owned scene: it keeps remote applies from echoing back
//! out ([`EchoSuppressor`]) and keeps a bounded linear undo/redo stack of
//! local edits ([`History`]).
//!
//! The crate logs through `tracing` and installs no subscriber.

pub mod bridge;
pub mod clock;
pub mod config;
pub mod echo;
pub mod error;
pub mod history;
pub mod session;

pub use bridge::{EditOutcome, EventSink, LocalEdit, Scene, SceneBridge};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use echo::{DEFAULT_ECHO_WINDOW, EchoSuppressor};
pub use error::ClientError;
pub use history::{DEFAULT_HISTORY_CAPACITY, History, HistoryEntry};
pub use session::{Parked, SessionEvent, SessionHandle, SessionState, SessionStatus, spawn_session};
