#![forbid(unsafe_code)]

//! Reversible units of work.
//!
//! A [`Change`] carries one forward effect (`redo`) and its inverse
//! (`undo`). The tracker applies the forward effect exactly once when the
//! change is tracked and from then on guarantees strict alternation: a
//! change never sees the same direction twice in a row, so implementations
//! can assume the target is in the state their next direction expects.
//!
//! The concrete variants cover the common cases:
//!
//! - [`BlankChange`]: a recorded no-op, used to keep step counts stable when
//!   an attempted edit had no effect.
//! - [`CallbackChange`]: both directions supplied as closures.
//! - [`ValueChange`]: an old and a new value replayed through one setter.
//! - [`FieldChange`] / [`PropertyChange`]: a named attribute resolved
//!   against the target's [`AttrRegistry`](crate::attrs::AttrRegistry).
//!
//! Anything else can implement [`Change`] directly and go through
//! [`ChangeTracker::track`](crate::tracker::ChangeTracker::track).

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::attrs::{AttrEntry, AttrKind, AttrValue, Reflective, resolve_for_write};
use crate::error::TrackError;

/// Closure replayed in one direction by a [`CallbackChange`].
pub type ChangeFn = Box<dyn FnMut()>;

/// Setter invoked by a [`ValueChange`] with the old or the new value.
pub type ApplyFn<T> = Box<dyn FnMut(&T)>;

// =============================================================================
// Change trait
// =============================================================================

/// A reversible unit of work.
///
/// `redo` and `undo` are infallible: all validation belongs in the
/// constructor, before the change enters the history.
pub trait Change {
    /// Apply the forward effect.
    fn redo(&mut self);

    /// Apply the inverse effect.
    fn undo(&mut self);

    /// Short label describing where the change came from.
    fn label(&self) -> Option<&str> {
        None
    }

    /// Concrete type name for debug output.
    fn debug_name(&self) -> &'static str {
        "Change"
    }
}

impl fmt::Debug for dyn Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.debug_name())
            .field("label", &self.label())
            .finish()
    }
}

// =============================================================================
// BlankChange
// =============================================================================

/// A recorded no-op.
///
/// Collection adapters track one when a removal targets an element that is
/// not present, so every attempted edit still costs exactly one undo step.
#[derive(Debug, Clone, Default)]
pub struct BlankChange {
    label: Option<String>,
}

impl BlankChange {
    /// Create a blank change carrying an optional label.
    #[must_use]
    pub fn new(label: Option<&str>) -> Self {
        Self {
            label: label.map(str::to_owned),
        }
    }
}

impl Change for BlankChange {
    fn redo(&mut self) {}

    fn undo(&mut self) {}

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn debug_name(&self) -> &'static str {
        "BlankChange"
    }
}

// =============================================================================
// CallbackChange
// =============================================================================

/// A change whose two directions are caller-supplied closures.
pub struct CallbackChange {
    label: Option<String>,
    redo: ChangeFn,
    undo: ChangeFn,
}

impl CallbackChange {
    /// Wrap a redo/undo closure pair.
    ///
    /// The pair must be symmetric: after `redo` then `undo` the observable
    /// state of whatever they touch is back where it started.
    pub fn new(
        redo: impl FnMut() + 'static,
        undo: impl FnMut() + 'static,
        label: Option<&str>,
    ) -> Self {
        Self {
            label: label.map(str::to_owned),
            redo: Box::new(redo),
            undo: Box::new(undo),
        }
    }
}

impl Change for CallbackChange {
    fn redo(&mut self) {
        (self.redo)();
    }

    fn undo(&mut self) {
        (self.undo)();
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn debug_name(&self) -> &'static str {
        "CallbackChange"
    }
}

impl fmt::Debug for CallbackChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackChange")
            .field("label", &self.label)
            .finish()
    }
}

// =============================================================================
// ValueChange
// =============================================================================

/// A change holding an old and a new value replayed through one setter.
pub struct ValueChange<T> {
    label: Option<String>,
    apply: ApplyFn<T>,
    old_value: T,
    new_value: T,
}

impl<T> ValueChange<T> {
    /// Wrap a setter plus the value it held before and the value to apply.
    ///
    /// The caller supplies `old_value`; the setter is not consulted to read
    /// the current state.
    pub fn new(
        apply: impl FnMut(&T) + 'static,
        old_value: T,
        new_value: T,
        label: Option<&str>,
    ) -> Self {
        Self {
            label: label.map(str::to_owned),
            apply: Box::new(apply),
            old_value,
            new_value,
        }
    }
}

impl<T> Change for ValueChange<T> {
    fn redo(&mut self) {
        (self.apply)(&self.new_value);
    }

    fn undo(&mut self) {
        (self.apply)(&self.old_value);
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn debug_name(&self) -> &'static str {
        "ValueChange"
    }
}

impl<T> fmt::Debug for ValueChange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueChange")
            .field("label", &self.label)
            .field("value_type", &std::any::type_name::<T>())
            .finish()
    }
}

// =============================================================================
// Attribute changes
// =============================================================================

// Shared guts of FieldChange and PropertyChange: a resolved accessor, the
// target, and the boxed old/new values. The old value is read at
// construction time, before the tracker applies the new one.
struct AttrChange<T: Reflective> {
    label: Option<String>,
    target: Rc<RefCell<T>>,
    entry: &'static AttrEntry<T>,
    old_value: AttrValue,
    new_value: AttrValue,
}

impl<T: Reflective> AttrChange<T> {
    fn build(
        kind: AttrKind,
        target: &Rc<RefCell<T>>,
        attribute: &str,
        new_value: AttrValue,
        label: Option<&str>,
    ) -> Result<Self, TrackError> {
        let entry = resolve_for_write::<T>(kind, attribute, new_value.as_ref())?;
        let old_value = entry.read(&target.borrow());
        Ok(Self {
            label: label.map(str::to_owned),
            target: Rc::clone(target),
            entry,
            old_value,
            new_value,
        })
    }

    fn apply_new(&mut self) {
        self.entry
            .write(&mut self.target.borrow_mut(), self.new_value.as_ref());
    }

    fn apply_old(&mut self) {
        self.entry
            .write(&mut self.target.borrow_mut(), self.old_value.as_ref());
    }
}

/// A change to a named field of a [`Reflective`] target.
///
/// Construction resolves the field against the target's registry and reads
/// the old value; it does not write anything. The tracker applies the new
/// value through the first `redo`.
pub struct FieldChange<T: Reflective> {
    inner: AttrChange<T>,
}

impl<T: Reflective> FieldChange<T> {
    /// Resolve `attribute` as a field and capture the current value.
    ///
    /// Fails with [`TrackError::UnknownAttribute`] when the name does not
    /// resolve and [`TrackError::AttributeTypeMismatch`] when `value` has a
    /// different type than the registered accessor.
    pub fn new(
        target: &Rc<RefCell<T>>,
        attribute: &str,
        value: impl Any,
        label: Option<&str>,
    ) -> Result<Self, TrackError> {
        AttrChange::build(AttrKind::Field, target, attribute, Box::new(value), label)
            .map(|inner| Self { inner })
    }
}

impl<T: Reflective> Change for FieldChange<T> {
    fn redo(&mut self) {
        self.inner.apply_new();
    }

    fn undo(&mut self) {
        self.inner.apply_old();
    }

    fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    fn debug_name(&self) -> &'static str {
        "FieldChange"
    }
}

impl<T: Reflective> fmt::Debug for FieldChange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldChange")
            .field("label", &self.inner.label)
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

/// A change to a named property of a [`Reflective`] target.
///
/// Identical to [`FieldChange`] except that the name resolves in the
/// property namespace, whose accessors may run arbitrary get/set logic.
pub struct PropertyChange<T: Reflective> {
    inner: AttrChange<T>,
}

impl<T: Reflective> PropertyChange<T> {
    /// Resolve `attribute` as a property and capture the current value.
    pub fn new(
        target: &Rc<RefCell<T>>,
        attribute: &str,
        value: impl Any,
        label: Option<&str>,
    ) -> Result<Self, TrackError> {
        AttrChange::build(
            AttrKind::Property,
            target,
            attribute,
            Box::new(value),
            label,
        )
        .map(|inner| Self { inner })
    }
}

impl<T: Reflective> Change for PropertyChange<T> {
    fn redo(&mut self) {
        self.inner.apply_new();
    }

    fn undo(&mut self) {
        self.inner.apply_old();
    }

    fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    fn debug_name(&self) -> &'static str {
        "PropertyChange"
    }
}

impl<T: Reflective> fmt::Debug for PropertyChange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyChange")
            .field("label", &self.inner.label)
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}
