#![forbid(unsafe_code)]

//! The change tracker: owner of the history and the open-group stack.
//!
//! Every entry point follows the same contract: build the change, apply its
//! forward effect exactly once, then record it. Recording routes to the
//! innermost open group when one exists and commits to the history buffer
//! otherwise:
//!
//! ```text
//!   track_value / track_field / track(..)     undo / redo / reset
//!                 │                                  │
//!                 ▼                                  │
//!          change.redo()  applied once               │
//!                 │                                  ▼
//!          group open? ──yes──▶ innermost     ┌────────────────┐
//!                 │             open group    │ HistoryBuffer  │
//!                 no                          │ [a b c | x y]  │
//!                 │                           │   cursor ▲     │
//!                 └───────── commit ─────────▶└────────────────┘
//! ```
//!
//! # Invariants
//!
//! - A change's `redo` has always run once before the change is recorded,
//!   so the tracked state and the history never disagree.
//! - `undo`, `redo`, and `reset` refuse to run while a group is open.
//! - Failed entry points (unknown attribute, mismatched value type) record
//!   nothing and touch nothing.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::attrs::{NotifyAttrChanged, Reflective};
use crate::change::{
    BlankChange, CallbackChange, Change, FieldChange, PropertyChange, ValueChange,
};
use crate::error::TrackError;
use crate::group::ChangeGroup;
use crate::history::HistoryBuffer;
use crate::pin::Pin;

/// Records reversible changes and replays them on demand.
///
/// The tracker is single-threaded by design: tracked targets live behind
/// `Rc<RefCell<..>>` and callbacks are plain `FnMut` closures. Embed one
/// tracker per document or editing context and pass it `&mut` to whatever
/// performs edits.
pub struct ChangeTracker {
    history: HistoryBuffer,
    open_groups: Vec<ChangeGroup>,
}

impl ChangeTracker {
    /// Create a tracker with unbounded history.
    #[must_use]
    pub fn new() -> Self {
        Self::with_change_limit(0)
    }

    /// Create a tracker that keeps at most `limit` undoable changes.
    ///
    /// Once full, committing another change silently drops the oldest one.
    /// A limit of `0` means unbounded.
    #[must_use]
    pub fn with_change_limit(limit: usize) -> Self {
        Self {
            history: HistoryBuffer::new(limit),
            open_groups: Vec::new(),
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Whether a call to [`undo`](Self::undo) would reverse a change.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether a call to [`redo`](Self::redo) would reapply a change.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of changes [`undo`](Self::undo) can currently walk back.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.history.undoable_count()
    }

    /// Number of undone changes [`redo`](Self::redo) can currently replay.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.history.redoable_count()
    }

    /// The configured history bound; `0` means unbounded.
    #[must_use]
    pub fn change_limit(&self) -> usize {
        self.history.limit()
    }

    /// Whether at least one group is open.
    #[must_use]
    pub fn is_grouping(&self) -> bool {
        !self.open_groups.is_empty()
    }

    /// Current group nesting depth.
    #[must_use]
    pub fn group_depth(&self) -> usize {
        self.open_groups.len()
    }

    // =========================================================================
    // Tracking entry points
    // =========================================================================

    /// Apply `change` forward once and record it.
    ///
    /// This is the generic entry point for caller-implemented [`Change`]
    /// types; the `track_*` helpers below all funnel through it.
    pub fn track(&mut self, mut change: Box<dyn Change>) {
        change.redo();
        self.record(change);
    }

    /// Record a no-op that still costs one undo step.
    pub fn blank_change(&mut self, label: Option<&str>) {
        self.track(Box::new(BlankChange::new(label)));
    }

    /// Track a change whose two directions are the given closures.
    ///
    /// `redo` runs once immediately.
    pub fn track_callback(
        &mut self,
        redo: impl FnMut() + 'static,
        undo: impl FnMut() + 'static,
        label: Option<&str>,
    ) {
        self.track(Box::new(CallbackChange::new(redo, undo, label)));
    }

    /// Track a value swap replayed through `apply`.
    ///
    /// `apply` is called once immediately with `new_value`; undo calls it
    /// with `old_value`.
    pub fn track_value<T: 'static>(
        &mut self,
        apply: impl FnMut(&T) + 'static,
        old_value: T,
        new_value: T,
        label: Option<&str>,
    ) {
        self.track(Box::new(ValueChange::new(apply, old_value, new_value, label)));
    }

    /// Track an assignment to a named field of a [`Reflective`] target.
    ///
    /// The field resolves against [`Reflective::attributes`]; the old value
    /// is captured and `value` is applied once. On error nothing is
    /// recorded and the target is untouched.
    pub fn track_field<T: Reflective>(
        &mut self,
        target: &Rc<RefCell<T>>,
        attribute: &str,
        value: impl Any,
        label: Option<&str>,
    ) -> Result<(), TrackError> {
        let change = FieldChange::new(target, attribute, value, label)?;
        self.track(Box::new(change));
        Ok(())
    }

    /// Track an assignment to a named property of a [`Reflective`] target.
    pub fn track_property<T: Reflective>(
        &mut self,
        target: &Rc<RefCell<T>>,
        attribute: &str,
        value: impl Any,
        label: Option<&str>,
    ) -> Result<(), TrackError> {
        let change = PropertyChange::new(target, attribute, value, label)?;
        self.track(Box::new(change));
        Ok(())
    }

    // =========================================================================
    // Grouping
    // =========================================================================

    /// Open a group; every change tracked until the matching
    /// [`end_group`](Self::end_group) joins it.
    ///
    /// Groups nest. While any group is open, [`undo`](Self::undo),
    /// [`redo`](Self::redo), and [`reset`](Self::reset) are refused.
    pub fn begin_group(&mut self, label: Option<&str>) {
        self.open_groups.push(ChangeGroup::new(label));
        tracing::debug!(depth = self.open_groups.len(), label = ?label, "begin group");
    }

    /// Close the innermost open group and keep its contents.
    ///
    /// An empty group vanishes without recording anything. A top-level
    /// group holding exactly one child and no post effects commits as that
    /// bare child. A nested group without post effects splices its children
    /// into the parent; with post effects it joins the parent whole, so the
    /// effects still fire when the parent replays.
    pub fn end_group(&mut self) -> Result<(), TrackError> {
        let Some(group) = self.open_groups.pop() else {
            return Err(TrackError::NoOpenGroup {
                operation: "end_group",
            });
        };
        tracing::debug!(
            depth = self.open_groups.len() + 1,
            children = group.child_count(),
            "end group"
        );

        if group.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.open_groups.last_mut() {
            if group.has_post_effects() {
                parent.push_child(Box::new(group));
            } else {
                parent.append_children(group.into_children());
            }
        } else if !group.has_post_effects() && group.child_count() == 1 {
            let mut children = group.into_children();
            if let Some(only) = children.pop() {
                self.history.commit(only);
            }
        } else {
            self.history.commit(Box::new(group));
        }
        Ok(())
    }

    /// Close the innermost open group and reverse everything it captured.
    ///
    /// The group's changes undo in reverse order and its post effects fire,
    /// then the group is dropped without entering the history.
    pub fn discard_group(&mut self) -> Result<(), TrackError> {
        let Some(mut group) = self.open_groups.pop() else {
            return Err(TrackError::NoOpenGroup {
                operation: "discard_group",
            });
        };
        tracing::debug!(
            depth = self.open_groups.len() + 1,
            children = group.child_count(),
            "discard group"
        );

        if group.is_empty() {
            return Ok(());
        }
        group.undo();
        Ok(())
    }

    /// Register a callback on the innermost group, fired after the group
    /// undoes or redoes its children.
    ///
    /// The callback also runs once immediately, so registration and replay
    /// observe the same sequence of calls.
    pub fn add_group_post_callback(
        &mut self,
        callback: impl FnMut() + 'static,
    ) -> Result<(), TrackError> {
        let Some(group) = self.open_groups.last_mut() else {
            return Err(TrackError::NoOpenGroup {
                operation: "add_group_post_callback",
            });
        };
        let mut callback = callback;
        callback();
        group.push_post_callback(Box::new(callback));
        Ok(())
    }

    /// Register a change notification on the innermost group, fired after
    /// the group undoes or redoes its children.
    ///
    /// Duplicate registrations of the same receiver and attribute collapse
    /// to one replayed notification, but the immediate notification below
    /// still fires every time.
    pub fn add_group_notify(
        &mut self,
        target: Rc<dyn NotifyAttrChanged>,
        attribute: &str,
    ) -> Result<(), TrackError> {
        let Some(group) = self.open_groups.last_mut() else {
            return Err(TrackError::NoOpenGroup {
                operation: "add_group_notify",
            });
        };
        group.push_notify(&target, attribute);
        target.notify_attr_changed(attribute);
        Ok(())
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Reverse the most recent applied change.
    ///
    /// Returns `Ok(false)` when there is nothing to undo. Refused while a
    /// group is open.
    pub fn undo(&mut self) -> Result<bool, TrackError> {
        self.ensure_not_grouping("undo")?;
        let undone = self.history.undo();
        tracing::trace!(undone, remaining = self.history.undoable_count(), "undo");
        Ok(undone)
    }

    /// Reapply the most recently undone change.
    ///
    /// Returns `Ok(false)` when there is nothing to redo. Refused while a
    /// group is open.
    pub fn redo(&mut self) -> Result<bool, TrackError> {
        self.ensure_not_grouping("redo")?;
        let redone = self.history.redo();
        tracing::trace!(redone, remaining = self.history.redoable_count(), "redo");
        Ok(redone)
    }

    /// Drop the entire history without touching tracked state.
    ///
    /// Outstanding [`Pin`]s become invalid. Resetting an already empty
    /// tracker changes nothing, and pins stay valid. Refused while a group
    /// is open.
    pub fn reset(&mut self) -> Result<(), TrackError> {
        self.ensure_not_grouping("reset")?;
        if self.history.reset() {
            tracing::debug!(generation = self.history.generation(), "history reset");
        }
        Ok(())
    }

    /// Change the history bound; `0` lifts it.
    ///
    /// Setting the current value is a no-op. Setting a new positive bound
    /// first resets the history, so it is refused while a group is open.
    /// Lifting the bound keeps existing entries.
    pub fn set_change_limit(&mut self, limit: usize) -> Result<(), TrackError> {
        if limit == self.history.limit() {
            return Ok(());
        }
        if limit > 0 {
            self.reset()?;
        }
        self.history.set_limit(limit);
        tracing::debug!(limit, "change limit set");
        Ok(())
    }

    /// Capture the current history position for later drift checks.
    #[must_use]
    pub fn pin_current(&self) -> Pin {
        Pin {
            generation: self.history.generation(),
            position: self.history.absolute_position(),
            occupant: self.history.cursor_serial(),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    pub(crate) fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    fn record(&mut self, change: Box<dyn Change>) {
        match self.open_groups.last_mut() {
            Some(group) => group.push_child(change),
            None => self.history.commit(change),
        }
    }

    fn ensure_not_grouping(&self, operation: &'static str) -> Result<(), TrackError> {
        if self.open_groups.is_empty() {
            Ok(())
        } else {
            Err(TrackError::GroupingActive { operation })
        }
    }
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeTracker")
            .field("undoable", &self.history.undoable_count())
            .field("redoable", &self.history.redoable_count())
            .field("limit", &self.history.limit())
            .field("open_groups", &self.open_groups.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_tracker() -> (ChangeTracker, Rc<RefCell<i32>>) {
        (ChangeTracker::new(), Rc::new(RefCell::new(0)))
    }

    fn bump(tracker: &mut ChangeTracker, slot: &Rc<RefCell<i32>>, amount: i32) {
        let up = Rc::clone(slot);
        let down = Rc::clone(slot);
        tracker.track_callback(
            move || *up.borrow_mut() += amount,
            move || *down.borrow_mut() -= amount,
            Some("bump"),
        );
    }

    #[test]
    fn test_new_tracker_is_idle() {
        let tracker = ChangeTracker::new();
        assert!(!tracker.can_undo());
        assert!(!tracker.can_redo());
        assert!(!tracker.is_grouping());
        assert_eq!(tracker.undo_depth(), 0);
        assert_eq!(tracker.redo_depth(), 0);
        assert_eq!(tracker.change_limit(), 0);
        assert_eq!(tracker.group_depth(), 0);
    }

    #[test]
    fn test_track_applies_forward_effect_immediately() {
        let (mut tracker, slot) = counter_tracker();
        bump(&mut tracker, &slot, 5);
        assert_eq!(*slot.borrow(), 5);
        assert!(tracker.can_undo());
        assert!(!tracker.can_redo());
    }

    #[test]
    fn test_undo_and_redo_round_trip() {
        let (mut tracker, slot) = counter_tracker();
        bump(&mut tracker, &slot, 1);
        bump(&mut tracker, &slot, 2);
        assert_eq!(*slot.borrow(), 3);

        assert!(tracker.undo().unwrap());
        assert_eq!(*slot.borrow(), 1);
        assert!(tracker.undo().unwrap());
        assert_eq!(*slot.borrow(), 0);
        assert!(!tracker.undo().unwrap());

        assert!(tracker.redo().unwrap());
        assert!(tracker.redo().unwrap());
        assert_eq!(*slot.borrow(), 3);
        assert!(!tracker.redo().unwrap());
    }

    #[test]
    fn test_tracking_after_undo_drops_the_redo_tail() {
        let (mut tracker, slot) = counter_tracker();
        bump(&mut tracker, &slot, 1);
        bump(&mut tracker, &slot, 2);
        tracker.undo().unwrap();
        assert!(tracker.can_redo());

        bump(&mut tracker, &slot, 10);
        assert!(!tracker.can_redo());
        assert_eq!(tracker.undo_depth(), 2);
        assert_eq!(*slot.borrow(), 11);
    }

    #[test]
    fn test_bounded_tracker_evicts_oldest() {
        let mut tracker = ChangeTracker::with_change_limit(3);
        let slot = Rc::new(RefCell::new(0));
        for _ in 0..5 {
            bump(&mut tracker, &slot, 1);
        }
        assert_eq!(tracker.undo_depth(), 3);
        assert_eq!(*slot.borrow(), 5);

        while tracker.undo().unwrap() {}
        // Two evicted bumps can never be walked back.
        assert_eq!(*slot.borrow(), 2);
    }

    #[test]
    fn test_group_commits_as_one_step() {
        let (mut tracker, slot) = counter_tracker();
        tracker.begin_group(Some("both"));
        bump(&mut tracker, &slot, 1);
        bump(&mut tracker, &slot, 2);
        assert!(!tracker.can_undo());
        tracker.end_group().unwrap();

        assert_eq!(tracker.undo_depth(), 1);
        tracker.undo().unwrap();
        assert_eq!(*slot.borrow(), 0);
        tracker.redo().unwrap();
        assert_eq!(*slot.borrow(), 3);
    }

    #[test]
    fn test_empty_group_records_nothing() {
        let mut tracker = ChangeTracker::new();
        tracker.begin_group(None);
        tracker.end_group().unwrap();
        assert!(!tracker.can_undo());
    }

    #[test]
    fn test_single_child_group_undoes_like_a_bare_change() {
        let (mut tracker, slot) = counter_tracker();
        tracker.begin_group(Some("wrapper"));
        bump(&mut tracker, &slot, 7);
        tracker.end_group().unwrap();

        assert_eq!(tracker.undo_depth(), 1);
        tracker.undo().unwrap();
        assert_eq!(*slot.borrow(), 0);
        assert_eq!(tracker.undo_depth(), 0);
    }

    #[test]
    fn test_nested_group_flows_into_parent() {
        let (mut tracker, slot) = counter_tracker();
        tracker.begin_group(Some("outer"));
        bump(&mut tracker, &slot, 1);
        tracker.begin_group(Some("inner"));
        bump(&mut tracker, &slot, 2);
        tracker.end_group().unwrap();
        assert!(tracker.is_grouping());
        assert!(!tracker.can_undo());
        tracker.end_group().unwrap();

        assert_eq!(tracker.undo_depth(), 1);
        tracker.undo().unwrap();
        assert_eq!(*slot.borrow(), 0);
    }

    #[test]
    fn test_history_ops_are_refused_while_grouping() {
        let mut tracker = ChangeTracker::new();
        tracker.begin_group(None);

        assert_eq!(
            tracker.undo().unwrap_err(),
            TrackError::GroupingActive { operation: "undo" }
        );
        assert_eq!(
            tracker.redo().unwrap_err(),
            TrackError::GroupingActive { operation: "redo" }
        );
        assert_eq!(
            tracker.reset().unwrap_err(),
            TrackError::GroupingActive { operation: "reset" }
        );
    }

    #[test]
    fn test_group_ops_require_an_open_group() {
        let mut tracker = ChangeTracker::new();
        assert!(matches!(
            tracker.end_group(),
            Err(TrackError::NoOpenGroup { .. })
        ));
        assert!(matches!(
            tracker.discard_group(),
            Err(TrackError::NoOpenGroup { .. })
        ));
        assert!(matches!(
            tracker.add_group_post_callback(|| {}),
            Err(TrackError::NoOpenGroup { .. })
        ));

        struct Silent;
        impl NotifyAttrChanged for Silent {
            fn notify_attr_changed(&self, _attribute: &str) {}
        }
        assert!(matches!(
            tracker.add_group_notify(Rc::new(Silent), "x"),
            Err(TrackError::NoOpenGroup { .. })
        ));
    }

    #[test]
    fn test_discard_group_reverses_its_changes() {
        let (mut tracker, slot) = counter_tracker();
        bump(&mut tracker, &slot, 1);

        tracker.begin_group(Some("speculative"));
        bump(&mut tracker, &slot, 10);
        bump(&mut tracker, &slot, 100);
        assert_eq!(*slot.borrow(), 111);
        tracker.discard_group().unwrap();

        assert_eq!(*slot.borrow(), 1);
        assert!(!tracker.is_grouping());
        assert_eq!(tracker.undo_depth(), 1);
    }

    #[test]
    fn test_post_callback_fires_immediately_and_on_replay() {
        let (mut tracker, slot) = counter_tracker();
        let fired = Rc::new(RefCell::new(0));

        tracker.begin_group(None);
        bump(&mut tracker, &slot, 1);
        let count = Rc::clone(&fired);
        tracker
            .add_group_post_callback(move || *count.borrow_mut() += 1)
            .unwrap();
        assert_eq!(*fired.borrow(), 1);
        tracker.end_group().unwrap();
        assert_eq!(*fired.borrow(), 1);

        tracker.undo().unwrap();
        assert_eq!(*fired.borrow(), 2);
        tracker.redo().unwrap();
        assert_eq!(*fired.borrow(), 3);
    }

    #[test]
    fn test_duplicate_notify_still_fires_immediately() {
        struct Recorder {
            count: RefCell<usize>,
        }
        impl NotifyAttrChanged for Recorder {
            fn notify_attr_changed(&self, _attribute: &str) {
                *self.count.borrow_mut() += 1;
            }
        }

        let recorder = Rc::new(Recorder {
            count: RefCell::new(0),
        });
        let (mut tracker, slot) = counter_tracker();

        tracker.begin_group(None);
        bump(&mut tracker, &slot, 1);
        tracker
            .add_group_notify(Rc::clone(&recorder) as Rc<dyn NotifyAttrChanged>, "v")
            .unwrap();
        tracker
            .add_group_notify(Rc::clone(&recorder) as Rc<dyn NotifyAttrChanged>, "v")
            .unwrap();
        assert_eq!(*recorder.count.borrow(), 2);
        tracker.end_group().unwrap();

        // The replayed registration was deduplicated.
        tracker.undo().unwrap();
        assert_eq!(*recorder.count.borrow(), 3);
    }

    #[test]
    fn test_reset_clears_history_and_keeps_state() {
        let (mut tracker, slot) = counter_tracker();
        bump(&mut tracker, &slot, 4);
        tracker.reset().unwrap();

        assert!(!tracker.can_undo());
        assert!(!tracker.can_redo());
        assert_eq!(*slot.borrow(), 4);
    }

    #[test]
    fn test_set_change_limit_to_current_value_keeps_history() {
        let (mut tracker, slot) = counter_tracker();
        bump(&mut tracker, &slot, 1);
        tracker.set_change_limit(0).unwrap();
        assert!(tracker.can_undo());
    }

    #[test]
    fn test_set_change_limit_to_new_bound_resets() {
        let (mut tracker, slot) = counter_tracker();
        bump(&mut tracker, &slot, 1);
        tracker.set_change_limit(4).unwrap();
        assert!(!tracker.can_undo());
        assert_eq!(tracker.change_limit(), 4);
    }

    #[test]
    fn test_lifting_the_limit_keeps_history() {
        let mut tracker = ChangeTracker::with_change_limit(2);
        let slot = Rc::new(RefCell::new(0));
        bump(&mut tracker, &slot, 1);
        bump(&mut tracker, &slot, 2);

        tracker.set_change_limit(0).unwrap();
        assert_eq!(tracker.undo_depth(), 2);

        for _ in 0..5 {
            bump(&mut tracker, &slot, 1);
        }
        assert_eq!(tracker.undo_depth(), 7);
    }

    #[test]
    fn test_set_change_limit_while_grouping_is_refused() {
        let mut tracker = ChangeTracker::new();
        tracker.begin_group(None);
        assert_eq!(
            tracker.set_change_limit(3).unwrap_err(),
            TrackError::GroupingActive { operation: "reset" }
        );
        // Lifting the bound skips the reset and is allowed mid-group.
        tracker.end_group().unwrap();
        tracker.set_change_limit(3).unwrap();
        tracker.begin_group(None);
        tracker.set_change_limit(0).unwrap();
        assert_eq!(tracker.change_limit(), 0);
    }

    #[test]
    fn test_pin_tracks_position_identity() {
        let (mut tracker, slot) = counter_tracker();
        bump(&mut tracker, &slot, 1);
        let pin = tracker.pin_current();
        assert!(pin.is_valid(&tracker));

        bump(&mut tracker, &slot, 2);
        assert!(!pin.is_valid(&tracker));

        tracker.undo().unwrap();
        assert!(pin.is_valid(&tracker));
    }

    #[test]
    fn test_pin_rejects_substituted_occupant() {
        let (mut tracker, slot) = counter_tracker();
        bump(&mut tracker, &slot, 1);
        bump(&mut tracker, &slot, 2);
        let pin = tracker.pin_current();

        tracker.undo().unwrap();
        bump(&mut tracker, &slot, 9);
        // Same depth as at capture, but a different change occupies it.
        assert_eq!(tracker.undo_depth(), 2);
        assert!(!pin.is_valid(&tracker));
    }

    #[test]
    fn test_reset_invalidates_pins_unless_nothing_cleared() {
        let (mut tracker, slot) = counter_tracker();
        let idle_pin = tracker.pin_current();
        tracker.reset().unwrap();
        assert!(idle_pin.is_valid(&tracker));

        bump(&mut tracker, &slot, 1);
        let pin = tracker.pin_current();
        tracker.reset().unwrap();
        assert!(!pin.is_valid(&tracker));
        assert!(!idle_pin.is_valid(&tracker));
    }

    #[test]
    fn test_debug_summary_is_compact() {
        let mut tracker = ChangeTracker::with_change_limit(8);
        tracker.blank_change(None);
        tracker.begin_group(None);
        let rendered = format!("{tracker:?}");
        assert!(rendered.contains("undoable: 1"));
        assert!(rendered.contains("limit: 8"));
        assert!(rendered.contains("open_groups: 1"));
        tracker.end_group().unwrap();
    }
}
