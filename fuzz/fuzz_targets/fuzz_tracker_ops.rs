#![no_main]

use std::cell::Cell;
use std::rc::Rc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use retrace::{ChangeTracker, NotifyAttrChanged};

#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Set(i16),
    Undo,
    Redo,
    BeginGroup,
    EndGroup,
    DiscardGroup,
    PostCallback,
    Notify,
    Reset,
    SetLimit(u8),
    PinAndCheck,
}

struct NotifySink;

impl NotifyAttrChanged for NotifySink {
    fn notify_attr_changed(&self, _attribute: &str) {}
}

fuzz_target!(|input: (u8, Vec<FuzzOp>)| {
    let (limit_seed, ops) = input;
    let mut tracker = ChangeTracker::with_change_limit(usize::from(limit_seed % 8));
    let register = Rc::new(Cell::new(0i32));
    let fired = Rc::new(Cell::new(0u32));
    let sink = Rc::new(NotifySink);

    for op in ops {
        match op {
            FuzzOp::Set(value) => {
                let old = register.get();
                let target = Rc::clone(&register);
                tracker.track_value(move |v: &i32| target.set(*v), old, i32::from(value), None);
            }
            FuzzOp::Undo => {
                let _ = tracker.undo();
            }
            FuzzOp::Redo => {
                let _ = tracker.redo();
            }
            FuzzOp::BeginGroup => tracker.begin_group(None),
            FuzzOp::EndGroup => {
                let _ = tracker.end_group();
            }
            FuzzOp::DiscardGroup => {
                let _ = tracker.discard_group();
            }
            FuzzOp::PostCallback => {
                let count = Rc::clone(&fired);
                let _ = tracker.add_group_post_callback(move || count.set(count.get() + 1));
            }
            FuzzOp::Notify => {
                let _ = tracker
                    .add_group_notify(Rc::clone(&sink) as Rc<dyn NotifyAttrChanged>, "value");
            }
            FuzzOp::Reset => {
                let _ = tracker.reset();
            }
            FuzzOp::SetLimit(n) => {
                let _ = tracker.set_change_limit(usize::from(n % 8));
            }
            FuzzOp::PinAndCheck => {
                assert!(
                    tracker.pin_current().is_valid(&tracker),
                    "fresh pin must be valid"
                );
            }
        }
    }

    // Post-conditions that must always hold:
    assert_eq!(tracker.can_undo(), tracker.undo_depth() > 0);
    assert_eq!(tracker.can_redo(), tracker.redo_depth() > 0);
    if tracker.change_limit() > 0 {
        assert!(
            tracker.undo_depth() + tracker.redo_depth() <= tracker.change_limit(),
            "history exceeds its bound"
        );
    }

    // Close whatever groups the input left open, then walk the full history
    // both ways. The walk must visit exactly undo_depth entries and end on
    // the value it started from.
    while tracker.end_group().is_ok() {}
    assert!(!tracker.is_grouping());

    let settled = register.get();
    let depth = tracker.undo_depth();

    let mut undone = 0;
    while tracker.undo().unwrap() {
        undone += 1;
    }
    assert_eq!(undone, depth, "undo walk length mismatch");
    assert!(!tracker.can_undo());

    let mut redone = 0;
    while tracker.redo().unwrap() {
        redone += 1;
    }
    assert_eq!(redone, depth, "redo walk length mismatch");
    assert!(!tracker.can_redo());
    assert_eq!(register.get(), settled, "undo/redo round trip must be identity");
});
