#![forbid(unsafe_code)]

//! Undo-aware wrapper around `HashSet`.

use std::cell::RefCell;
use std::collections::HashSet;
use std::hash::Hash;
use std::rc::Rc;

use crate::tracker::ChangeTracker;

/// A set whose mutations are recorded as reversible changes.
pub struct TrackedSet<T> {
    items: Rc<RefCell<HashSet<T>>>,
}

impl<T> TrackedSet<T>
where
    T: Eq + Hash + Clone + 'static,
{
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::from_set(HashSet::new())
    }

    /// Wrap existing contents. The initial contents are not undoable.
    #[must_use]
    pub fn from_set(items: HashSet<T>) -> Self {
        Self {
            items: Rc::new(RefCell::new(items)),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.items.borrow().contains(item)
    }

    // =========================================================================
    // Tracked mutations
    // =========================================================================

    /// Insert `item`.
    ///
    /// Returns `false` and records a blank change when the item was already
    /// present; undoing a blank step must not remove an element the step
    /// never added.
    pub fn insert(&self, tracker: &mut ChangeTracker, item: T) -> bool {
        if self.contains(&item) {
            tracker.blank_change(Some("set.insert"));
            return false;
        }
        let items = Rc::clone(&self.items);
        let undo_items = Rc::clone(&self.items);
        let undo_item = item.clone();
        tracker.track_callback(
            move || {
                items.borrow_mut().insert(item.clone());
            },
            move || {
                undo_items.borrow_mut().remove(&undo_item);
            },
            Some("set.insert"),
        );
        true
    }

    /// Remove `item`.
    ///
    /// Returns `false` and records a blank change when the item is not
    /// present.
    pub fn remove(&self, tracker: &mut ChangeTracker, item: &T) -> bool {
        if !self.contains(item) {
            tracker.blank_change(Some("set.remove"));
            return false;
        }
        let items = Rc::clone(&self.items);
        let undo_items = Rc::clone(&self.items);
        let redo_item = item.clone();
        let undo_item = item.clone();
        tracker.track_callback(
            move || {
                items.borrow_mut().remove(&redo_item);
            },
            move || {
                undo_items.borrow_mut().insert(undo_item.clone());
            },
            Some("set.remove"),
        );
        true
    }

    /// Remove every element, recording one undo step that restores the
    /// whole contents.
    pub fn clear(&self, tracker: &mut ChangeTracker) {
        let contents = self.items.borrow().clone();
        let items = Rc::clone(&self.items);
        let undo_items = Rc::clone(&self.items);
        tracker.track_callback(
            move || items.borrow_mut().clear(),
            move || *undo_items.borrow_mut() = contents.clone(),
            Some("set.clear"),
        );
    }
}

impl<T> Default for TrackedSet<T>
where
    T: Eq + Hash + Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

// Handles share storage; clone does not copy elements.
impl<T> Clone for TrackedSet<T> {
    fn clone(&self) -> Self {
        Self {
            items: Rc::clone(&self.items),
        }
    }
}
