#![forbid(unsafe_code)]

//! Error type shared by tracking, grouping, and history operations.

use std::fmt;

use crate::attrs::AttrKind;

/// Why a tracker operation was refused.
///
/// Every failure is reported before any state is touched: a returned error
/// means the history buffer, the open group stack, and the tracked targets
/// are all exactly as they were before the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    /// `undo`, `redo`, or `reset` was called while at least one group is
    /// still open.
    GroupingActive {
        /// The operation that was refused.
        operation: &'static str,
    },
    /// A group-scoped operation was called with no open group.
    NoOpenGroup {
        /// The operation that was refused.
        operation: &'static str,
    },
    /// An attribute name did not resolve against the target's registry.
    UnknownAttribute {
        /// Type name of the tracked target.
        target: &'static str,
        /// Whether a field or a property was looked up.
        kind: AttrKind,
        /// The name that failed to resolve.
        attribute: String,
    },
    /// The supplied value's type does not match the registered accessor.
    AttributeTypeMismatch {
        /// The attribute whose accessor rejected the value.
        attribute: String,
        /// Type name the accessor was registered with.
        expected: &'static str,
    },
}

impl fmt::Display for TrackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupingActive { operation } => {
                write!(f, "cannot {operation} while grouping is active")
            }
            Self::NoOpenGroup { operation } => {
                write!(f, "cannot {operation}: no group is open")
            }
            Self::UnknownAttribute {
                target,
                kind,
                attribute,
            } => {
                write!(f, "type `{target}` has no {kind} named `{attribute}`")
            }
            Self::AttributeTypeMismatch {
                attribute,
                expected,
            } => {
                write!(
                    f,
                    "attribute `{attribute}` expects a value of type `{expected}`"
                )
            }
        }
    }
}

impl std::error::Error for TrackError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_grouping_active() {
        let err = TrackError::GroupingActive { operation: "undo" };
        assert_eq!(err.to_string(), "cannot undo while grouping is active");
    }

    #[test]
    fn test_display_no_open_group() {
        let err = TrackError::NoOpenGroup {
            operation: "end_group",
        };
        assert_eq!(err.to_string(), "cannot end_group: no group is open");
    }

    #[test]
    fn test_display_unknown_attribute() {
        let err = TrackError::UnknownAttribute {
            target: "Sprite",
            kind: AttrKind::Property,
            attribute: "missing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "type `Sprite` has no property named `missing`"
        );
    }

    #[test]
    fn test_display_type_mismatch() {
        let err = TrackError::AttributeTypeMismatch {
            attribute: "name".to_string(),
            expected: "alloc::string::String",
        };
        assert_eq!(
            err.to_string(),
            "attribute `name` expects a value of type `alloc::string::String`"
        );
    }

    #[test]
    fn test_errors_are_comparable() {
        let a = TrackError::NoOpenGroup { operation: "undo" };
        let b = TrackError::NoOpenGroup { operation: "undo" };
        assert_eq!(a, b);
        assert_ne!(a, TrackError::GroupingActive { operation: "undo" });
    }
}
