//! Linear undo/redo history of full-scene snapshots.
//!
//! The pointer names the entry that matches the current scene. Committing
//! after an undo discards everything past the pointer. The stack is bounded;
//! overflow evicts the oldest entry.
//!
//! Undo and redo hand back a snapshot to restore as a full replace. Restoring
//! it must not be committed again; callers keep user edits and history
//! replay on separate paths.

use std::collections::VecDeque;

use serde_json::Value;

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry<S> {
    /// Monotonic commit number; survives eviction of earlier entries.
    pub ordinal: u64,
    pub snapshot: S,
}

#[derive(Debug, Clone)]
pub struct History<S = Value> {
    entries: VecDeque<HistoryEntry<S>>,
    pointer: Option<usize>,
    capacity: usize,
    next_ordinal: u64,
}

impl<S> Default for History<S> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl<S> History<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// History holding at most `capacity` entries (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity), pointer: None, capacity, next_ordinal: 0 }
    }

    /// Record a snapshot of the scene after a user edit.
    pub fn commit(&mut self, snapshot: S) {
        if let Some(pointer) = self.pointer {
            self.entries.truncate(pointer + 1);
        }

        self.entries.push_back(HistoryEntry { ordinal: self.next_ordinal, snapshot });
        self.next_ordinal += 1;

        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.pointer = self.entries.len().checked_sub(1);
    }

    /// Step back. `None` (and no change) at the oldest entry or when empty.
    pub fn undo(&mut self) -> Option<&HistoryEntry<S>> {
        let pointer = self.pointer.filter(|p| *p > 0)? - 1;
        self.pointer = Some(pointer);
        self.entries.get(pointer)
    }

    /// Step forward. `None` (and no change) at the newest entry or when empty.
    pub fn redo(&mut self) -> Option<&HistoryEntry<S>> {
        let pointer = self.pointer.filter(|p| p + 1 < self.entries.len())? + 1;
        self.pointer = Some(pointer);
        self.entries.get(pointer)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.pointer.is_some_and(|p| p > 0)
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.pointer.is_some_and(|p| p + 1 < self.entries.len())
    }

    /// Entry the scene currently matches.
    #[must_use]
    pub fn current(&self) -> Option<&HistoryEntry<S>> {
        self.entries.get(self.pointer?)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.pointer = None;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the current entry; `None` before the first commit.
    #[must_use]
    pub fn pointer(&self) -> Option<usize> {
        self.pointer
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
