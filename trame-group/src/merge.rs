//! Terminal-level merging: append into a record collection or overwrite a record slot.
//!
//! A stored collection is never grown in place. Appending builds a new collection holding
//! clones of the stored records followed by the new ones, and inserts it over the old one.

use std::alloc::Layout;
use std::mem::ManuallyDrop;

use facet_core::{
    Def, Facet, ListDef, ListInitInPlaceWithCapacityFn, ListPushFn, PtrConst, PtrMut, Shape,
};

use crate::errors::{GroupError, GroupErrorKind};
use crate::levels::MapLevel;
use crate::scalar::ScalarKey;
use crate::scratch::Scratch;

/// What the last map level stores under each key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
    /// A growable list of records; duplicates under one key path accumulate in input order.
    Collection,
    /// A single record; the last record under a key path wins.
    Slot,
}

impl TerminalKind {
    pub fn as_symbol(self) -> &'static str {
        match self {
            TerminalKind::Collection => "collection",
            TerminalKind::Slot => "slot",
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct Collection {
    shape: &'static Shape,
    list: ListDef,
    layout: Layout,
    init: ListInitInPlaceWithCapacityFn,
    push: ListPushFn,
}

#[derive(Clone, Copy)]
pub(crate) enum Terminal {
    Collection(Collection),
    Slot,
}

/// Classify the terminal value shape of the last level.
///
/// `index`/`name` locate the last key for error reporting; `levels` is the output's total
/// map depth, reported when the output nests deeper than the key path.
pub(crate) fn terminal_for<R: Facet<'static>>(
    value: &'static Shape,
    index: usize,
    name: &str,
    levels: usize,
) -> Result<Terminal, GroupError> {
    let err = |kind| GroupError::at_key(value, index, name, kind);

    match value.def {
        Def::Map(_) => Err(err(GroupErrorKind::DepthMismatch {
            keys: index + 1,
            levels,
        })),
        Def::List(list) => {
            let element = list.t();
            if !element.is_shape(R::SHAPE) {
                return Err(err(GroupErrorKind::ElementTypeMismatch {
                    expected: element,
                    actual: R::SHAPE,
                }));
            }
            let (Some(init), Some(push), Ok(layout)) = (
                list.init_in_place_with_capacity(),
                list.push(),
                value.layout.sized_layout(),
            ) else {
                return Err(err(GroupErrorKind::UnsupportedCollection { shape: value }));
            };
            Ok(Terminal::Collection(Collection {
                shape: value,
                list,
                layout,
                init,
                push,
            }))
        }
        _ => {
            if !value.is_shape(R::SHAPE) {
                return Err(err(GroupErrorKind::ElementTypeMismatch {
                    expected: value,
                    actual: R::SHAPE,
                }));
            }
            Ok(Terminal::Slot)
        }
    }
}

/// Move `record` onto the end of `list`.
unsafe fn push_record<R>(push: ListPushFn, list: PtrMut, record: R) {
    let mut record = ManuallyDrop::new(record);
    unsafe { push(list, PtrMut::new(&mut *record as *mut R)) };
}

impl Collection {
    /// # Safety
    /// `src` must point to an initialized list of this collection's shape.
    unsafe fn len(&self, src: PtrConst) -> usize {
        unsafe { (self.list.vtable.len)(src) }
    }

    /// Push clones of every record in `src` onto `dst`.
    ///
    /// # Safety
    /// Both must point to initialized lists of this collection's shape, holding `R`s, and
    /// must not overlap.
    unsafe fn extend_cloned<R: Clone>(&self, dst: PtrMut, src: PtrConst) {
        let len = unsafe { self.len(src) };
        for index in 0..len {
            if let Some(item) = unsafe { (self.list.vtable.get)(src, index, self.shape) } {
                let record = unsafe { item.get::<R>() }.clone();
                unsafe { push_record(self.push, dst, record) };
            }
        }
    }

    /// Build a new list from clones of `existing` (if any) followed by `records`.
    ///
    /// # Safety
    /// `existing` as for [`Collection::extend_cloned`]; `R` must be the element type.
    unsafe fn rebuild<R: Clone>(&self, existing: Option<PtrConst>, records: Vec<R>) -> Scratch {
        let slot = Scratch::new(self.layout);
        let kept = existing.map_or(0, |old| unsafe { self.len(old) });
        unsafe {
            let list = (self.init)(slot.uninit(), kept + records.len());
            if let Some(old) = existing {
                self.extend_cloned::<R>(list, old);
            }
            for record in records {
                push_record(self.push, list, record);
            }
        }
        slot
    }
}

impl Terminal {
    pub(crate) fn kind(&self) -> TerminalKind {
        match self {
            Terminal::Collection(_) => TerminalKind::Collection,
            Terminal::Slot => TerminalKind::Slot,
        }
    }

    /// Store the batch's `records` for `key` in the last level. Returns `true` when a new
    /// collection was created for the key.
    ///
    /// # Safety
    /// `map` must point to an initialized map of `level`'s shape, writable by the caller,
    /// and `R` must be the record type this terminal was classified for.
    pub(crate) unsafe fn store<R: Clone>(
        &self,
        level: &MapLevel,
        map: PtrMut,
        key: ScalarKey,
        records: Vec<R>,
    ) -> bool {
        match self {
            Terminal::Collection(collection) => {
                let existing = unsafe { level.lookup(map.as_const(), &key) };
                if existing.is_none() {
                    tracing::trace!(key = %key, level = level.key.name, "creating collection");
                }
                let slot = unsafe { collection.rebuild(existing, records) };
                unsafe { level.insert(map, key, slot.ptr()) };
                existing.is_none()
            }
            Terminal::Slot => {
                if let Some(record) = records.into_iter().last() {
                    let mut record = ManuallyDrop::new(record);
                    unsafe { level.insert(map, key, PtrMut::new(&mut *record as *mut R)) };
                }
                false
            }
        }
    }

    /// Insert a clone of the stored terminal value `src` under `key` in `map`.
    ///
    /// # Safety
    /// As for [`Terminal::store`]; `src` must point to an initialized terminal value that
    /// does not live inside `map`.
    pub(crate) unsafe fn copy_into<R: Clone>(
        &self,
        level: &MapLevel,
        map: PtrMut,
        key: ScalarKey,
        src: PtrConst,
    ) {
        match self {
            Terminal::Collection(collection) => {
                let slot = unsafe { collection.rebuild::<R>(Some(src), Vec::new()) };
                unsafe { level.insert(map, key, slot.ptr()) };
            }
            Terminal::Slot => {
                let mut record = ManuallyDrop::new(unsafe { src.get::<R>() }.clone());
                unsafe { level.insert(map, key, PtrMut::new(&mut *record as *mut R)) };
            }
        }
    }
}
