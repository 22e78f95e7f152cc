//! Error types for grouping.

use std::fmt;

use facet_core::Shape;

/// Position of the offending key inside the key path.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPosition {
    /// Zero-based index into the key path.
    pub index: usize,
    /// The field name as the caller spelled it.
    pub name: String,
}

/// Location where an error occurred.
pub struct ErrorLocation {
    /// The output level (or the record, for field errors) being validated.
    pub shape: &'static Shape,
    /// `None` when the error is not tied to a single key.
    pub key: Option<KeyPosition>,
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(key) = &self.key {
            write!(f, "key #{} ({:?}) in ", key.index, key.name)?;
        }
        write!(f, "{}", self.shape.type_identifier)
    }
}

impl fmt::Debug for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// An error while compiling or applying a grouping.
///
/// Every variant is terminal: the call that produced it did not touch the output.
pub struct GroupError {
    pub location: ErrorLocation,
    pub kind: GroupErrorKind,
}

impl GroupError {
    /// Create an error for the key at `index` of the key path.
    pub fn at_key(
        shape: &'static Shape,
        index: usize,
        name: impl Into<String>,
        kind: GroupErrorKind,
    ) -> Self {
        Self {
            location: ErrorLocation {
                shape,
                key: Some(KeyPosition {
                    index,
                    name: name.into(),
                }),
            },
            kind,
        }
    }

    /// Create an error that is not tied to a key.
    pub fn at_shape(shape: &'static Shape, kind: GroupErrorKind) -> Self {
        Self {
            location: ErrorLocation { shape, key: None },
            kind,
        }
    }
}

impl fmt::Display for GroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.location)
    }
}

impl fmt::Debug for GroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for GroupError {}

/// The kind of grouping error.
pub enum GroupErrorKind {
    /// The key path names no fields.
    EmptyKeyPath,
    /// The record type has no named fields to group by.
    RecordNotAStruct,
    /// The record type has no reflected field with this name.
    InaccessibleField,
    /// The field exists but is neither an integer nor `String`.
    UnsupportedFieldType { field: &'static Shape },
    /// A level that must hold a map does not.
    NotAMap,
    /// A map level's key type differs from the field's type.
    KeyTypeMismatch {
        expected: &'static Shape,
        actual: &'static Shape,
    },
    /// The key path length differs from the output's map nesting depth.
    DepthMismatch { keys: usize, levels: usize },
    /// The terminal collection or slot cannot hold the record type.
    ElementTypeMismatch {
        expected: &'static Shape,
        actual: &'static Shape,
    },
    /// A list or map the output needs cannot be created, copied or appended to through
    /// reflection.
    UnsupportedCollection { shape: &'static Shape },
}

impl fmt::Display for GroupErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupErrorKind::EmptyKeyPath => write!(f, "Key path must name at least one field"),
            GroupErrorKind::RecordNotAStruct => write!(f, "Record type is not a struct"),
            GroupErrorKind::InaccessibleField => {
                write!(f, "Record type has no accessible field with this name")
            }
            GroupErrorKind::UnsupportedFieldType { field } => {
                write!(
                    f,
                    "Field type {} cannot be a key (must be an integer or String)",
                    field.type_identifier
                )
            }
            GroupErrorKind::NotAMap => write!(f, "Output level is not a map"),
            GroupErrorKind::KeyTypeMismatch { expected, actual } => {
                write!(
                    f,
                    "Key type mismatch: map keys are {}, field is {}",
                    expected.type_identifier, actual.type_identifier
                )
            }
            GroupErrorKind::DepthMismatch { keys, levels } => {
                write!(
                    f,
                    "Key path has {} key(s) but the output has {} map level(s)",
                    keys, levels
                )
            }
            GroupErrorKind::ElementTypeMismatch { expected, actual } => {
                write!(
                    f,
                    "Cannot store a {} where the output holds {}",
                    actual.type_identifier, expected.type_identifier
                )
            }
            GroupErrorKind::UnsupportedCollection { shape } => {
                write!(
                    f,
                    "Collection type {} cannot be created or appended to",
                    shape.type_identifier
                )
            }
        }
    }
}

impl fmt::Debug for GroupErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
