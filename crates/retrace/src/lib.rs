#![forbid(unsafe_code)]

//! Undo/redo change tracking for interactive applications.
//!
//! # Role in an application
//! `retrace` is the editing history for a document, scene, or UI-bound
//! model: every mutation is registered as a reversible [`Change`], and the
//! [`ChangeTracker`] replays them backward and forward on demand. The
//! tracker applies each change's forward effect exactly once at tracking
//! time, so callers mutate and record in a single call.
//!
//! # This crate provides
//! - [`ChangeTracker`] with bounded or unbounded history, undo/redo, and
//!   full reset.
//! - Change variants: [`BlankChange`], [`CallbackChange`], [`ValueChange`],
//!   [`FieldChange`], and [`PropertyChange`], plus the [`Change`] trait for
//!   custom ones.
//! - Group nesting with commit, discard, flattening, and replayed post
//!   effects ([`ChangeTracker::begin_group`]).
//! - [`Pin`] checkpoints that detect drift from a saved position in O(1).
//! - [`AttrRegistry`] named-accessor tables so plain structs can be edited
//!   by attribute name ([`Reflective`]).
//! - Tracked collections: [`TrackedList`], [`TrackedMap`], [`TrackedSet`].
//!
//! # How it fits together
//! State lives in the application behind `Rc<RefCell<..>>`; the tracker
//! only holds the recorded closures and values needed to replay edits. One
//! tracker per editing context, used from one thread.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use retrace::ChangeTracker;
//!
//! let mut tracker = ChangeTracker::new();
//! let score = Rc::new(RefCell::new(0_i32));
//!
//! let target = Rc::clone(&score);
//! tracker.track_value(move |v: &i32| *target.borrow_mut() = *v, 0, 10, Some("set score"));
//! assert_eq!(*score.borrow(), 10);
//!
//! assert!(tracker.undo().unwrap());
//! assert_eq!(*score.borrow(), 0);
//! assert!(tracker.redo().unwrap());
//! assert_eq!(*score.borrow(), 10);
//! ```

/// Named-attribute registries and notification traits.
pub mod attrs;
/// The `Change` trait and its concrete variants.
pub mod change;
/// Tracked wrappers around the standard collections.
pub mod collections;
/// The error type shared by all tracker operations.
pub mod error;
/// Drift-detecting history checkpoints.
pub mod pin;
/// The change tracker façade.
pub mod tracker;

mod group;
mod history;

pub use attrs::{AttrKind, AttrRegistry, AttrValue, NotifyAttrChanged, Reflective};
pub use change::{
    ApplyFn, BlankChange, CallbackChange, Change, ChangeFn, FieldChange, PropertyChange,
    ValueChange,
};
pub use collections::{TrackedList, TrackedMap, TrackedSet};
pub use error::TrackError;
pub use pin::Pin;
pub use tracker::ChangeTracker;
