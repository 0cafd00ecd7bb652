#![forbid(unsafe_code)]

//! Capacity-bounded buffer of committed changes.
//!
//! Entries below the `undoable` cursor have been applied; entries at or
//! above it have been undone and are waiting for redo:
//!
//! ```text
//!             undoable = 3
//!                  │
//!   [ e0  e1  e2 ] │ [ r0  r1 ]
//!     undoable side    redoable tail
//! ```
//!
//! # Invariants
//!
//! - `undoable <= entries.len()` at all times.
//! - A commit truncates the redoable tail before appending.
//! - With a non-zero limit the buffer never holds more than `limit`
//!   entries; the oldest undoable entry is evicted and the eviction count
//!   grows. Dropping a redoable tail does not count as eviction.
//! - Serial ids grow monotonically and are never reused, not even across
//!   resets.
//! - The generation changes only on a reset that actually cleared entries.

use std::collections::VecDeque;

use crate::change::Change;

#[derive(Debug)]
struct HistoryEntry {
    serial: u64,
    change: Box<dyn Change>,
}

#[derive(Debug)]
pub(crate) struct HistoryBuffer {
    entries: VecDeque<HistoryEntry>,
    /// Count of applied entries; doubles as the cursor position.
    undoable: usize,
    /// Maximum entry count; `0` disables the bound.
    limit: usize,
    evictions: u64,
    generation: u64,
    next_serial: u64,
}

impl HistoryBuffer {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            undoable: 0,
            limit,
            evictions: 0,
            generation: 0,
            next_serial: 0,
        }
    }

    pub(crate) fn can_undo(&self) -> bool {
        self.undoable > 0
    }

    pub(crate) fn can_redo(&self) -> bool {
        self.undoable < self.entries.len()
    }

    pub(crate) fn undoable_count(&self) -> usize {
        self.undoable
    }

    pub(crate) fn redoable_count(&self) -> usize {
        self.entries.len() - self.undoable
    }

    pub(crate) fn limit(&self) -> usize {
        self.limit
    }

    /// The tracker resets before lowering into a bound; lifting the bound
    /// to zero leaves existing entries in place.
    pub(crate) fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Position of the cursor on the axis of every commit ever made, so a
    /// position survives evictions unchanged.
    pub(crate) fn absolute_position(&self) -> u64 {
        self.evictions + self.undoable as u64
    }

    /// Serial id of the newest applied entry, if any.
    pub(crate) fn cursor_serial(&self) -> Option<u64> {
        self.undoable
            .checked_sub(1)
            .map(|index| self.entries[index].serial)
    }

    pub(crate) fn commit(&mut self, change: Box<dyn Change>) {
        self.entries.truncate(self.undoable);
        if self.limit > 0 && self.entries.len() == self.limit {
            self.entries.pop_front();
            self.evictions += 1;
            tracing::trace!(evictions = self.evictions, "history full, dropped oldest entry");
        }
        let serial = self.next_serial;
        self.next_serial += 1;
        tracing::trace!(serial, label = ?change.label(), "commit");
        self.entries.push_back(HistoryEntry { serial, change });
        self.undoable = self.entries.len();
    }

    pub(crate) fn undo(&mut self) -> bool {
        let Some(index) = self.undoable.checked_sub(1) else {
            return false;
        };
        self.entries[index].change.undo();
        self.undoable = index;
        true
    }

    pub(crate) fn redo(&mut self) -> bool {
        if self.undoable == self.entries.len() {
            return false;
        }
        self.entries[self.undoable].change.redo();
        self.undoable += 1;
        true
    }

    /// Clear everything. Returns `false` when there was nothing to clear,
    /// in which case the generation is untouched.
    pub(crate) fn reset(&mut self) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        self.entries.clear();
        self.undoable = 0;
        self.evictions = 0;
        self.generation += 1;
        true
    }
}
