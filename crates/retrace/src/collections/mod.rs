#![forbid(unsafe_code)]

//! Tracked wrappers around the standard collections.
//!
//! Each wrapper keeps its storage behind `Rc<RefCell<..>>` and takes the
//! tracker as an explicit `&mut` argument per call, so a collection can
//! participate in whichever tracker drives the current editing context.
//! Handles are cheap to clone and share the same storage.
//!
//! Every mutation records exactly one undo step. Mutations that turn out to
//! have no effect, such as removing an element that is not present, record
//! a [`BlankChange`](crate::change::BlankChange) and report `false`, so the
//! number of recorded steps stays predictable for the caller.

mod list;
mod map;
mod set;

pub use list::TrackedList;
pub use map::TrackedMap;
pub use set::TrackedSet;
