#![forbid(unsafe_code)]

//! Composite changes assembled by the grouping protocol.
//!
//! A group replays its children in tracking order on redo and in reverse on
//! undo. Post callbacks and notify pairs fire after the children in both
//! directions, always in registration order.

use std::fmt;
use std::rc::Rc;

use crate::attrs::NotifyAttrChanged;
use crate::change::Change;

/// Callback fired after a group's children have undone or redone.
pub type GroupPostFn = Box<dyn FnMut()>;

/// An ordered composite of changes plus post effects.
///
/// Only the tracker constructs these, between `begin_group` and the closing
/// `end_group`.
pub(crate) struct ChangeGroup {
    label: Option<String>,
    children: Vec<Box<dyn Change>>,
    post_callbacks: Vec<GroupPostFn>,
    notify_pairs: Vec<(Rc<dyn NotifyAttrChanged>, String)>,
}

impl ChangeGroup {
    pub(crate) fn new(label: Option<&str>) -> Self {
        Self {
            label: label.map(str::to_owned),
            children: Vec::new(),
            post_callbacks: Vec::new(),
            notify_pairs: Vec::new(),
        }
    }

    pub(crate) fn push_child(&mut self, change: Box<dyn Change>) {
        self.children.push(change);
    }

    pub(crate) fn append_children(&mut self, children: Vec<Box<dyn Change>>) {
        self.children.extend(children);
    }

    pub(crate) fn push_post_callback(&mut self, callback: GroupPostFn) {
        self.post_callbacks.push(callback);
    }

    /// Register a notify pair, deduplicated by receiver identity and
    /// attribute name. Returns `false` when the pair was already present.
    pub(crate) fn push_notify(
        &mut self,
        target: &Rc<dyn NotifyAttrChanged>,
        attribute: &str,
    ) -> bool {
        let present = self
            .notify_pairs
            .iter()
            .any(|(existing, name)| Rc::ptr_eq(existing, target) && name == attribute);
        if !present {
            self.notify_pairs
                .push((Rc::clone(target), attribute.to_owned()));
        }
        !present
    }

    /// A group with no children, callbacks, or notify pairs records nothing.
    pub(crate) fn is_empty(&self) -> bool {
        self.children.is_empty() && !self.has_post_effects()
    }

    pub(crate) fn has_post_effects(&self) -> bool {
        !self.post_callbacks.is_empty() || !self.notify_pairs.is_empty()
    }

    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }

    pub(crate) fn into_children(self) -> Vec<Box<dyn Change>> {
        self.children
    }

    fn fire_post_effects(&mut self) {
        for callback in &mut self.post_callbacks {
            callback();
        }
        for (target, attribute) in &self.notify_pairs {
            target.notify_attr_changed(attribute);
        }
    }
}

impl Change for ChangeGroup {
    fn redo(&mut self) {
        for child in &mut self.children {
            child.redo();
        }
        self.fire_post_effects();
    }

    fn undo(&mut self) {
        for child in self.children.iter_mut().rev() {
            child.undo();
        }
        self.fire_post_effects();
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn debug_name(&self) -> &'static str {
        "ChangeGroup"
    }
}

impl fmt::Debug for ChangeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeGroup")
            .field("label", &self.label)
            .field("children", &self.children.len())
            .field("post_callbacks", &self.post_callbacks.len())
            .field("notify_pairs", &self.notify_pairs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::change::CallbackChange;

    fn logging_child(log: &Rc<RefCell<Vec<String>>>, id: &'static str) -> Box<dyn Change> {
        let redo_log = Rc::clone(log);
        let undo_log = Rc::clone(log);
        Box::new(CallbackChange::new(
            move || redo_log.borrow_mut().push(format!("redo {id}")),
            move || undo_log.borrow_mut().push(format!("undo {id}")),
            Some(id),
        ))
    }

    struct Recorder {
        log: Rc<RefCell<Vec<String>>>,
    }

    impl NotifyAttrChanged for Recorder {
        fn notify_attr_changed(&self, attribute: &str) {
            self.log.borrow_mut().push(format!("notify {attribute}"));
        }
    }

    #[test]
    fn test_redo_runs_children_in_order_then_posts() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut group = ChangeGroup::new(Some("g"));
        group.push_child(logging_child(&log, "a"));
        group.push_child(logging_child(&log, "b"));
        let post_log = Rc::clone(&log);
        group.push_post_callback(Box::new(move || post_log.borrow_mut().push("post".to_string())));

        log.borrow_mut().clear();
        group.redo();
        assert_eq!(log.borrow().as_slice(), ["redo a", "redo b", "post"]);
    }

    #[test]
    fn test_undo_runs_children_reversed_then_posts() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut group = ChangeGroup::new(None);
        group.push_child(logging_child(&log, "a"));
        group.push_child(logging_child(&log, "b"));
        let post_log = Rc::clone(&log);
        group.push_post_callback(Box::new(move || post_log.borrow_mut().push("post".to_string())));

        log.borrow_mut().clear();
        group.undo();
        assert_eq!(log.borrow().as_slice(), ["undo b", "undo a", "post"]);
    }

    #[test]
    fn test_post_effects_fire_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut group = ChangeGroup::new(None);

        let first = Rc::clone(&log);
        group.push_post_callback(Box::new(move || first.borrow_mut().push("cb 0".to_string())));
        let second = Rc::clone(&log);
        group.push_post_callback(Box::new(move || second.borrow_mut().push("cb 1".to_string())));

        let recorder: Rc<dyn NotifyAttrChanged> = Rc::new(Recorder { log: Rc::clone(&log) });
        assert!(group.push_notify(&recorder, "x"));
        assert!(group.push_notify(&recorder, "y"));

        group.redo();
        assert_eq!(
            log.borrow().as_slice(),
            ["cb 0", "cb 1", "notify x", "notify y"]
        );
    }

    #[test]
    fn test_push_notify_dedupes_same_target_and_attribute() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut group = ChangeGroup::new(None);
        let recorder: Rc<dyn NotifyAttrChanged> = Rc::new(Recorder { log: Rc::clone(&log) });

        assert!(group.push_notify(&recorder, "x"));
        assert!(!group.push_notify(&recorder, "x"));
        assert!(group.push_notify(&recorder, "y"));

        group.undo();
        assert_eq!(log.borrow().as_slice(), ["notify x", "notify y"]);
    }

    #[test]
    fn test_emptiness_accounts_for_post_effects() {
        let mut group = ChangeGroup::new(None);
        assert!(group.is_empty());

        group.push_post_callback(Box::new(|| {}));
        assert!(!group.is_empty());
        assert!(group.has_post_effects());
        assert_eq!(group.child_count(), 0);
    }
}
