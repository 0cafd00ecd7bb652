#![forbid(unsafe_code)]

//! Named-attribute access for tracked targets.
//!
//! An [`AttrRegistry`] is a statically built table mapping attribute names to
//! typed get/set accessors for one target type. Types opt in through
//! [`Reflective`], and the tracker resolves names against the registry when
//! it constructs field and property changes:
//!
//! ```text
//!   track_property(target, "name", value)
//!            │
//!            ▼
//!   T::attributes() ── resolve("name", Property) ──▶ AttrEntry
//!            │                                          │
//!     old = entry.read(&target)              entry.write(&mut target, new)
//! ```
//!
//! Resolution happens while the change is constructed, so an unknown name or
//! a mismatched value type fails before the target is touched.
//!
//! # Invariants
//!
//! - Entries are scanned newest-first: re-registering a name shadows the
//!   earlier accessor, which lets a type override an inherited attribute.
//! - `write` is only ever called with a value whose [`TypeId`] matched the
//!   accessor at construction time.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;

use crate::error::TrackError;

/// Boxed attribute value crossing the accessor boundary.
pub type AttrValue = Box<dyn Any>;

type GetFn<T> = Box<dyn Fn(&T) -> AttrValue + Send + Sync>;
type SetFn<T> = Box<dyn Fn(&mut T, &dyn Any) + Send + Sync>;

// =============================================================================
// Attribute kinds
// =============================================================================

/// Whether a registered accessor models a plain field or a property.
///
/// The two kinds live in separate namespaces: a field and a property may
/// share a name without shadowing each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
    /// A directly stored struct member.
    Field,
    /// An accessor pair that may run arbitrary get/set logic.
    Property,
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field => f.write_str("field"),
            Self::Property => f.write_str("property"),
        }
    }
}

// =============================================================================
// Registry entries
// =============================================================================

pub(crate) struct AttrEntry<T> {
    name: &'static str,
    kind: AttrKind,
    value_type: &'static str,
    value_type_id: TypeId,
    get: GetFn<T>,
    set: SetFn<T>,
}

impl<T> AttrEntry<T> {
    pub(crate) fn read(&self, target: &T) -> AttrValue {
        (self.get)(target)
    }

    /// Write `value` through the registered setter.
    ///
    /// The caller has already checked the value against [`value_type_id`];
    /// a downcast failure here is unreachable and leaves the target as is.
    ///
    /// [`value_type_id`]: Self::value_type_id
    pub(crate) fn write(&self, target: &mut T, value: &dyn Any) {
        (self.set)(target, value);
    }

    pub(crate) fn value_type(&self) -> &'static str {
        self.value_type
    }

    pub(crate) fn value_type_id(&self) -> TypeId {
        self.value_type_id
    }
}

impl<T> fmt::Debug for AttrEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttrEntry")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value_type", &self.value_type)
            .finish()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Table of named accessors for one target type.
///
/// Built once per type with the chained [`field`], [`property`], and
/// [`inherit`] registrars, then handed out as a `&'static` reference through
/// [`Reflective::attributes`].
///
/// [`field`]: Self::field
/// [`property`]: Self::property
/// [`inherit`]: Self::inherit
pub struct AttrRegistry<T> {
    target: &'static str,
    entries: Vec<AttrEntry<T>>,
}

impl<T: 'static> AttrRegistry<T> {
    /// Create an empty registry for `T`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            target: std::any::type_name::<T>(),
            entries: Vec::new(),
        }
    }

    /// Register a field accessor under `name`.
    ///
    /// Registering a name twice shadows the earlier accessor.
    #[must_use]
    pub fn field<V: Clone + 'static>(
        self,
        name: &'static str,
        get: fn(&T) -> V,
        set: fn(&mut T, V),
    ) -> Self {
        self.register(name, AttrKind::Field, get, set)
    }

    /// Register a property accessor under `name`.
    #[must_use]
    pub fn property<V: Clone + 'static>(
        self,
        name: &'static str,
        get: fn(&T) -> V,
        set: fn(&mut T, V),
    ) -> Self {
        self.register(name, AttrKind::Property, get, set)
    }

    fn register<V: Clone + 'static>(
        mut self,
        name: &'static str,
        kind: AttrKind,
        get: fn(&T) -> V,
        set: fn(&mut T, V),
    ) -> Self {
        self.entries.push(AttrEntry {
            name,
            kind,
            value_type: std::any::type_name::<V>(),
            value_type_id: TypeId::of::<V>(),
            get: Box::new(move |target: &T| -> AttrValue { Box::new(get(target)) }),
            set: Box::new(move |target: &mut T, value: &dyn Any| {
                if let Some(value) = value.downcast_ref::<V>() {
                    set(target, value.clone());
                }
            }),
        });
        self
    }

    /// Splice a base type's accessors in through a pair of projections.
    ///
    /// Call this before registering the type's own attributes so that own
    /// registrations shadow inherited names.
    #[must_use]
    pub fn inherit<P: 'static>(
        mut self,
        base: &'static AttrRegistry<P>,
        project: fn(&T) -> &P,
        project_mut: fn(&mut T) -> &mut P,
    ) -> Self {
        for entry in &base.entries {
            self.entries.push(AttrEntry {
                name: entry.name,
                kind: entry.kind,
                value_type: entry.value_type,
                value_type_id: entry.value_type_id,
                get: Box::new(move |target: &T| (entry.get)(project(target))),
                set: Box::new(move |target: &mut T, value: &dyn Any| {
                    (entry.set)(project_mut(target), value);
                }),
            });
        }
        self
    }

    /// Number of registered entries, shadowed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no accessor has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn target_name(&self) -> &'static str {
        self.target
    }

    // Newest-first so later registrations shadow earlier ones.
    pub(crate) fn resolve(&self, kind: AttrKind, name: &str) -> Option<&AttrEntry<T>> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.kind == kind && entry.name == name)
    }
}

impl<T: 'static> Default for AttrRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for AttrRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttrRegistry")
            .field("target", &self.target)
            .field(
                "entries",
                &self
                    .entries
                    .iter()
                    .map(|entry| (entry.kind, entry.name))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Resolve `attribute` for writing and check the replacement value's type.
pub(crate) fn resolve_for_write<T: Reflective>(
    kind: AttrKind,
    attribute: &str,
    value: &dyn Any,
) -> Result<&'static AttrEntry<T>, TrackError> {
    let registry = T::attributes();
    let Some(entry) = registry.resolve(kind, attribute) else {
        return Err(TrackError::UnknownAttribute {
            target: registry.target_name(),
            kind,
            attribute: attribute.to_owned(),
        });
    };
    if value.type_id() != entry.value_type_id() {
        return Err(TrackError::AttributeTypeMismatch {
            attribute: attribute.to_owned(),
            expected: entry.value_type(),
        });
    }
    Ok(entry)
}

// =============================================================================
// Traits
// =============================================================================

/// Exposes the accessor registry for a tracked type.
///
/// Implementations build their registry once and hand out a static
/// reference, typically through a [`std::sync::OnceLock`]:
///
/// ```
/// use std::sync::OnceLock;
///
/// use retrace::{AttrRegistry, Reflective};
///
/// struct Sprite {
///     x: i32,
/// }
///
/// impl Reflective for Sprite {
///     fn attributes() -> &'static AttrRegistry<Self> {
///         static REGISTRY: OnceLock<AttrRegistry<Sprite>> = OnceLock::new();
///         REGISTRY.get_or_init(|| {
///             AttrRegistry::new().field("x", |s: &Sprite| s.x, |s, v| s.x = v)
///         })
///     }
/// }
///
/// assert!(Sprite::attributes().len() == 1);
/// ```
pub trait Reflective: Sized + 'static {
    /// The registry mapping attribute names to accessors for this type.
    fn attributes() -> &'static AttrRegistry<Self>;
}

/// Change-notification hook fired by group notify registrations.
///
/// The tracker calls this once when the pair is registered and again after
/// every undo or redo of the owning group. Implementations must tolerate
/// repeated notification for the same attribute.
pub trait NotifyAttrChanged {
    /// Signal that the named attribute may have a new value.
    fn notify_attr_changed(&self, attribute: &str);
}

// Lets an Rc<RefCell<T>> target register directly as a notify receiver.
// Fires through a shared borrow; the cell must not be mutably borrowed when
// group post effects run.
impl<T: NotifyAttrChanged> NotifyAttrChanged for RefCell<T> {
    fn notify_attr_changed(&self, attribute: &str) {
        self.borrow().notify_attr_changed(attribute);
    }
}
