//! Record-side validation: resolving key names to readable fields.

use facet_core::{Facet, Shape, StructType, Type, UserType};

use crate::errors::{GroupError, GroupErrorKind};
use crate::scalar::{ScalarKey, ScalarKind};

/// A grouping key resolved against the record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyField {
    /// The reflected field name.
    pub name: &'static str,
    /// Byte offset of the field inside the record.
    pub offset: usize,
    pub kind: ScalarKind,
}

impl KeyField {
    /// Read this key out of a record.
    ///
    /// # Safety
    /// `record` must point to an initialized value of the struct this field was
    /// resolved against.
    pub(crate) unsafe fn read(&self, record: *const u8) -> ScalarKey {
        unsafe { self.kind.read(record.add(self.offset)) }
    }
}

/// The struct definition behind a record type.
pub(crate) fn record_struct<R: Facet<'static>>() -> Result<&'static StructType, GroupError> {
    match &R::SHAPE.ty {
        Type::User(UserType::Struct(st)) => Ok(st),
        _ => Err(GroupError::at_shape(
            R::SHAPE,
            GroupErrorKind::RecordNotAStruct,
        )),
    }
}

/// Resolve the key at `index` of the key path to a field of `record`.
pub(crate) fn resolve_key(
    record: &'static Shape,
    st: &'static StructType,
    index: usize,
    name: &str,
) -> Result<KeyField, GroupError> {
    let Some(field) = st.fields.iter().find(|field| field.name == name) else {
        return Err(GroupError::at_key(
            record,
            index,
            name,
            GroupErrorKind::InaccessibleField,
        ));
    };

    let field_shape = field.shape();
    let Some(kind) = ScalarKind::for_shape(field_shape) else {
        return Err(GroupError::at_key(
            record,
            index,
            name,
            GroupErrorKind::UnsupportedFieldType { field: field_shape },
        ));
    };

    Ok(KeyField {
        name: field.name,
        offset: field.offset,
        kind,
    })
}
