#![forbid(unsafe_code)]

//! Undo-aware wrapper around `Vec`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::tracker::ChangeTracker;

/// A growable list whose mutations are recorded as reversible changes.
///
/// Elements are cloned into the recorded closures, so `T: Clone` is
/// required; equality drives the by-value operations.
pub struct TrackedList<T> {
    items: Rc<RefCell<Vec<T>>>,
}

impl<T: Clone + PartialEq + 'static> TrackedList<T> {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Wrap existing contents. The initial contents are not undoable.
    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
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

    /// Clone out the element at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.items.borrow().get(index).cloned()
    }

    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.items.borrow().contains(item)
    }

    /// Index of the first element equal to `item`.
    #[must_use]
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.items.borrow().iter().position(|existing| existing == item)
    }

    /// Clone out the full contents.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.items.borrow().clone()
    }

    // =========================================================================
    // Tracked mutations
    // =========================================================================

    /// Append `item`, recording one undo step.
    pub fn push(&self, tracker: &mut ChangeTracker, item: T) {
        let items = Rc::clone(&self.items);
        let undo_items = Rc::clone(&self.items);
        tracker.track_callback(
            move || items.borrow_mut().push(item.clone()),
            move || {
                undo_items.borrow_mut().pop();
            },
            Some("list.push"),
        );
    }

    /// Insert `item` at `index`, recording one undo step.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, like [`Vec::insert`].
    pub fn insert(&self, tracker: &mut ChangeTracker, index: usize, item: T) {
        assert!(index <= self.len(), "insertion index out of bounds");
        let items = Rc::clone(&self.items);
        let undo_items = Rc::clone(&self.items);
        tracker.track_callback(
            move || items.borrow_mut().insert(index, item.clone()),
            move || {
                undo_items.borrow_mut().remove(index);
            },
            Some("list.insert"),
        );
    }

    /// Replace the element at `index`, recording one undo step.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn set(&self, tracker: &mut ChangeTracker, index: usize, item: T) {
        let previous = self.items.borrow()[index].clone();
        let items = Rc::clone(&self.items);
        let undo_items = Rc::clone(&self.items);
        tracker.track_callback(
            move || items.borrow_mut()[index] = item.clone(),
            move || undo_items.borrow_mut()[index] = previous.clone(),
            Some("list.set"),
        );
    }

    /// Remove the first element equal to `item`.
    ///
    /// Returns `false` and records a blank change when no element matches.
    pub fn remove(&self, tracker: &mut ChangeTracker, item: &T) -> bool {
        let Some(index) = self.index_of(item) else {
            tracker.blank_change(Some("list.remove"));
            return false;
        };
        self.remove_tracked(tracker, index, "list.remove");
        true
    }

    /// Remove the element at `index`.
    ///
    /// Returns `false` and records a blank change when `index` is out of
    /// range.
    pub fn remove_at(&self, tracker: &mut ChangeTracker, index: usize) -> bool {
        if index >= self.len() {
            tracker.blank_change(Some("list.remove_at"));
            return false;
        }
        self.remove_tracked(tracker, index, "list.remove_at");
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
            Some("list.clear"),
        );
    }

    /// Append every element of `iter` as one grouped undo step.
    ///
    /// An empty iterator records nothing.
    pub fn extend(&self, tracker: &mut ChangeTracker, iter: impl IntoIterator<Item = T>) {
        tracker.begin_group(Some("list.extend"));
        for item in iter {
            self.push(tracker, item);
        }
        // The group was just opened, so closing it cannot fail.
        let _ = tracker.end_group();
    }

    fn remove_tracked(&self, tracker: &mut ChangeTracker, index: usize, label: &'static str) {
        let removed = self.items.borrow()[index].clone();
        let items = Rc::clone(&self.items);
        let undo_items = Rc::clone(&self.items);
        tracker.track_callback(
            move || {
                items.borrow_mut().remove(index);
            },
            move || undo_items.borrow_mut().insert(index, removed.clone()),
            Some(label),
        );
    }
}

impl<T: Clone + PartialEq + 'static> Default for TrackedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Handles share storage; clone does not copy elements.
impl<T> Clone for TrackedList<T> {
    fn clone(&self) -> Self {
        Self {
            items: Rc::clone(&self.items),
        }
    }
}
