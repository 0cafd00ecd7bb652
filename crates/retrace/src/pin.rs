#![forbid(unsafe_code)]

//! Drift-detecting history checkpoints.

use crate::tracker::ChangeTracker;

/// A snapshot of the tracker's position, checkable in O(1).
///
/// A pin answers one question: is the tracker sitting on exactly the same
/// logical change it sat on when the pin was captured? Tracking, undoing,
/// or redoing moves the position and the pin reads invalid; undoing or
/// redoing back to the captured spot makes it valid again. Committing a
/// different change over an undone tail reuses the position but not the
/// identity, so the pin stays invalid. A reset that cleared entries
/// invalidates every outstanding pin, while evicting old entries from a
/// bounded buffer does not move the cursor and leaves pins valid.
///
/// The usual application is dirty-state bookkeeping: pin at save time, and
/// the document is unmodified exactly while the pin is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pin {
    pub(crate) generation: u64,
    pub(crate) position: u64,
    /// Serial id of the entry under the cursor at capture, `None` when the
    /// pin was taken with nothing to undo.
    pub(crate) occupant: Option<u64>,
}

impl Pin {
    /// Whether `tracker` currently sits where this pin was captured.
    #[must_use]
    pub fn is_valid(&self, tracker: &ChangeTracker) -> bool {
        let history = tracker.history();
        if self.generation != history.generation() {
            return false;
        }
        if self.position != history.absolute_position() {
            return false;
        }
        match (self.occupant, history.cursor_serial()) {
            (Some(pinned), Some(current)) => pinned == current,
            // A matching position with a captured occupant but no current
            // one means everything up to the pinned entry was evicted; the
            // cursor still denotes the same boundary. The reverse pairing
            // cannot occur because evictions only grow.
            _ => true,
        }
    }
}
