//! Key scalars: the field types records can be grouped by.
//!
//! Every supported type has one row in the `scalar_kinds!` table below. The table drives
//! shape classification, reading a field into an owned [`ScalarKey`], and materializing a
//! key back into its declared type so a map vtable can hash or move it.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::mem::ManuallyDrop;

use facet_core::{Facet, PtrConst, PtrMut, Shape};

/// Integer widths usable as keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntKind {
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
}

/// Field types usable as keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Int(IntKind),
    Text,
}

/// An owned key value read from a record field.
///
/// Two keys are equal only when both are integers with the same numeric value, or both
/// are text with the same content. Comparing an integer with text is never a match.
/// Hashing agrees with this equality.
#[derive(Clone)]
pub enum ScalarKey {
    Int { kind: IntKind, value: i128 },
    Text(String),
}

macro_rules! scalar_kinds {
    ($($kind:ident => $ty:ty),* $(,)?) => {
        impl IntKind {
            fn shape(self) -> &'static Shape {
                match self {
                    $(IntKind::$kind => <$ty as Facet<'static>>::SHAPE,)*
                }
            }

            fn as_symbol(self) -> &'static str {
                match self {
                    $(IntKind::$kind => stringify!($ty),)*
                }
            }

            fn for_shape(shape: &'static Shape) -> Option<Self> {
                $(
                    if shape.is_shape(<$ty as Facet<'static>>::SHAPE) {
                        return Some(IntKind::$kind);
                    }
                )*
                None
            }

            /// # Safety
            /// `ptr` must point to an initialized value of this kind's type.
            unsafe fn read(self, ptr: *const u8) -> i128 {
                match self {
                    $(IntKind::$kind => (unsafe { ptr.cast::<$ty>().read() }) as i128,)*
                }
            }

            fn with_ptr<T>(self, value: i128, f: impl FnOnce(PtrConst) -> T) -> T {
                match self {
                    $(IntKind::$kind => {
                        let typed = value as $ty;
                        f(PtrConst::new(&typed as *const $ty as *const u8))
                    })*
                }
            }

            fn with_mut_ptr<T>(self, value: i128, f: impl FnOnce(PtrMut) -> T) -> T {
                match self {
                    $(IntKind::$kind => {
                        let mut typed = value as $ty;
                        f(PtrMut::new(&mut typed as *mut $ty as *mut u8))
                    })*
                }
            }
        }
    };
}

scalar_kinds! {
    I8 => i8,
    I16 => i16,
    I32 => i32,
    I64 => i64,
    Isize => isize,
    U8 => u8,
    U16 => u16,
    U32 => u32,
    U64 => u64,
    Usize => usize,
}

impl ScalarKind {
    /// Classify a field shape. `None` for anything that is neither an integer nor `String`.
    pub fn for_shape(shape: &'static Shape) -> Option<Self> {
        if let Some(int) = IntKind::for_shape(shape) {
            return Some(ScalarKind::Int(int));
        }
        if shape.is_shape(<String as Facet<'static>>::SHAPE) {
            return Some(ScalarKind::Text);
        }
        None
    }

    /// The shape a map level must declare for its keys to accept this kind.
    pub fn shape(self) -> &'static Shape {
        match self {
            ScalarKind::Int(int) => int.shape(),
            ScalarKind::Text => <String as Facet<'static>>::SHAPE,
        }
    }

    pub fn as_symbol(self) -> &'static str {
        match self {
            ScalarKind::Int(int) => int.as_symbol(),
            ScalarKind::Text => "String",
        }
    }

    /// Read a key out of a field.
    ///
    /// # Safety
    /// `ptr` must point to an initialized value of this kind's type.
    pub(crate) unsafe fn read(self, ptr: *const u8) -> ScalarKey {
        match self {
            ScalarKind::Int(kind) => ScalarKey::Int {
                kind,
                value: unsafe { kind.read(ptr) },
            },
            ScalarKind::Text => ScalarKey::Text(unsafe { (*ptr.cast::<String>()).clone() }),
        }
    }
}

impl ScalarKey {
    pub fn kind(&self) -> ScalarKind {
        match self {
            ScalarKey::Int { kind, .. } => ScalarKind::Int(*kind),
            ScalarKey::Text(_) => ScalarKind::Text,
        }
    }

    /// Call `f` with a pointer to this key in its declared type, for lookups.
    pub(crate) fn with_ptr<T>(&self, f: impl FnOnce(PtrConst) -> T) -> T {
        match self {
            ScalarKey::Int { kind, value } => kind.with_ptr(*value, f),
            ScalarKey::Text(text) => f(PtrConst::new(text as *const String as *const u8)),
        }
    }

    /// Call `f` with a pointer to this key in its declared type. `f` takes ownership of
    /// the pointee: it must move the value out (as a map insert does).
    pub(crate) fn into_raw<T>(self, f: impl FnOnce(PtrMut) -> T) -> T {
        match self {
            ScalarKey::Int { kind, value } => kind.with_mut_ptr(value, f),
            ScalarKey::Text(text) => {
                let mut text = ManuallyDrop::new(text);
                f(PtrMut::new(&mut *text as *mut String as *mut u8))
            }
        }
    }
}

impl PartialEq for ScalarKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScalarKey::Int { value: a, .. }, ScalarKey::Int { value: b, .. }) => a == b,
            (ScalarKey::Text(a), ScalarKey::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarKey {}

impl Hash for ScalarKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ScalarKey::Int { value, .. } => {
                state.write_u8(0);
                value.hash(state);
            }
            ScalarKey::Text(text) => {
                state.write_u8(1);
                text.hash(state);
            }
        }
    }
}

impl fmt::Display for ScalarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKey::Int { value, .. } => write!(f, "{value}"),
            ScalarKey::Text(text) => write!(f, "{text:?}"),
        }
    }
}

impl fmt::Debug for ScalarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind().as_symbol(), self)
    }
}

impl From<&str> for ScalarKey {
    fn from(text: &str) -> Self {
        ScalarKey::Text(text.to_owned())
    }
}

impl From<String> for ScalarKey {
    fn from(text: String) -> Self {
        ScalarKey::Text(text)
    }
}

impl From<i64> for ScalarKey {
    fn from(value: i64) -> Self {
        ScalarKey::Int {
            kind: IntKind::I64,
            value: value as i128,
        }
    }
}
