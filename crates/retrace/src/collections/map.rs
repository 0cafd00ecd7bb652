#![forbid(unsafe_code)]

//! Undo-aware wrapper around `HashMap`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use crate::tracker::ChangeTracker;

/// A key/value map whose mutations are recorded as reversible changes.
pub struct TrackedMap<K, V> {
    entries: Rc<RefCell<HashMap<K, V>>>,
}

impl<K, V> TrackedMap<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
{
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::from_map(HashMap::new())
    }

    /// Wrap existing contents. The initial contents are not undoable.
    #[must_use]
    pub fn from_map(entries: HashMap<K, V>) -> Self {
        Self {
            entries: Rc::new(RefCell::new(entries)),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Clone out the value under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.borrow().get(key).cloned()
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.borrow().contains_key(key)
    }

    // =========================================================================
    // Tracked mutations
    // =========================================================================

    /// Set `key` to `value`, recording one undo step.
    ///
    /// Undoing restores the previous value when the key was present and
    /// removes the key when it was not.
    pub fn insert(&self, tracker: &mut ChangeTracker, key: K, value: V) {
        let previous = self.entries.borrow().get(&key).cloned();
        let entries = Rc::clone(&self.entries);
        let undo_entries = Rc::clone(&self.entries);
        let undo_key = key.clone();

        match previous {
            Some(old) => tracker.track_callback(
                move || {
                    entries.borrow_mut().insert(key.clone(), value.clone());
                },
                move || {
                    undo_entries.borrow_mut().insert(undo_key.clone(), old.clone());
                },
                Some("map.insert"),
            ),
            None => tracker.track_callback(
                move || {
                    entries.borrow_mut().insert(key.clone(), value.clone());
                },
                move || {
                    undo_entries.borrow_mut().remove(&undo_key);
                },
                Some("map.insert"),
            ),
        }
    }

    /// Remove `key`.
    ///
    /// Returns `false` and records a blank change when the key is not
    /// present.
    pub fn remove(&self, tracker: &mut ChangeTracker, key: &K) -> bool {
        let Some(value) = self.entries.borrow().get(key).cloned() else {
            tracker.blank_change(Some("map.remove"));
            return false;
        };
        let entries = Rc::clone(&self.entries);
        let undo_entries = Rc::clone(&self.entries);
        let redo_key = key.clone();
        let undo_key = key.clone();
        tracker.track_callback(
            move || {
                entries.borrow_mut().remove(&redo_key);
            },
            move || {
                undo_entries.borrow_mut().insert(undo_key.clone(), value.clone());
            },
            Some("map.remove"),
        );
        true
    }

    /// Remove every entry, recording one undo step that restores the whole
    /// contents.
    pub fn clear(&self, tracker: &mut ChangeTracker) {
        let contents = self.entries.borrow().clone();
        let entries = Rc::clone(&self.entries);
        let undo_entries = Rc::clone(&self.entries);
        tracker.track_callback(
            move || entries.borrow_mut().clear(),
            move || *undo_entries.borrow_mut() = contents.clone(),
            Some("map.clear"),
        );
    }
}

impl<K, V> Default for TrackedMap<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

// Handles share storage; clone does not copy entries.
impl<K, V> Clone for TrackedMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
        }
    }
}
