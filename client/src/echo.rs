//! Echo suppressor: keep remotely applied changes from being re-sent.
//!
//! DESIGN
//! ======
//! Applying a remote event to the local scene usually fires the same change
//! hooks a user edit does. Before applying, the caller marks the element id;
//! the local edit path asks [`EchoSuppressor::observe_local`] and drops the
//! edit if the id is marked.
//!
//! Each mark carries a deadline instead of a timer. A mark is gone once the
//! local path has observed it or once its window has elapsed, whichever
//! comes first, so an id can never stay marked forever. Expired marks are
//! pruned whenever a new one is added, so the map only holds marks from the
//! last window.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};

/// How long a remote mark suppresses local echoes.
pub const DEFAULT_ECHO_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct EchoSuppressor<C: Clock = SystemClock> {
    clock: C,
    window: Duration,
    marks: HashMap<String, Instant>,
}

impl Default for EchoSuppressor<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl EchoSuppressor<SystemClock> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock, DEFAULT_ECHO_WINDOW)
    }
}

impl<C: Clock> EchoSuppressor<C> {
    #[must_use]
    pub fn with_clock(clock: C, window: Duration) -> Self {
        Self { clock, window, marks: HashMap::new() }
    }

    /// Mark an element as being applied from a remote event. Re-marking
    /// extends the deadline.
    pub fn mark_applying(&mut self, element_id: &str) {
        let now = self.clock.now();
        self.marks.retain(|_, deadline| *deadline > now);
        self.marks.insert(element_id.to_owned(), now + self.window);
    }

    #[must_use]
    pub fn is_applying(&self, element_id: &str) -> bool {
        let now = self.clock.now();
        self.marks.get(element_id).is_some_and(|deadline| *deadline > now)
    }

    pub fn clear(&mut self, element_id: &str) {
        self.marks.remove(element_id);
    }

    /// Called by the local edit path. Returns `true` if the edit is an echo
    /// of a remote apply and must not be sent; the mark is consumed.
    pub fn observe_local(&mut self, element_id: &str) -> bool {
        let suppressed = self.is_applying(element_id);
        self.marks.remove(element_id);
        suppressed
    }

    /// Drop expired marks. Returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.marks.len();
        self.marks.retain(|_, deadline| *deadline > now);
        before - self.marks.len()
    }

    /// Marks currently held, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
#[path = "echo_test.rs"]
mod tests;
