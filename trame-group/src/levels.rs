//! Output-side navigation: one validated map level per key.
//!
//! Maps are only ever read through `PtrConst` (lookups, iteration) and written through
//! the vtable's `insert`. Nothing is mutated behind a pointer handed out by a lookup.

use std::alloc::Layout;

use facet_core::{
    Def, IterInitWithValueFn, IterVTable, MapDef, MapVTable, PtrConst, PtrMut, PtrUninit, Shape,
};

use crate::errors::GroupErrorKind;
use crate::scalar::ScalarKey;
use crate::schema::KeyField;

/// The map definition behind a shape, if it is a map.
pub(crate) fn as_map(shape: &'static Shape) -> Option<MapDef> {
    match shape.def {
        Def::Map(def) => Some(def),
        _ => None,
    }
}

/// How many map levels are nested at `shape` (0 if it is not a map).
pub(crate) fn map_depth(mut shape: &'static Shape) -> usize {
    let mut depth = 0;
    while let Some(def) = as_map(shape) {
        depth += 1;
        shape = def.v();
    }
    depth
}

/// A map level of the output container, validated against the key it is indexed by.
#[derive(Clone, Copy)]
pub(crate) struct MapLevel {
    pub shape: &'static Shape,
    pub def: MapDef,
    pub key: KeyField,
    /// Layout of a map of this level, for building one off to the side.
    pub layout: Layout,
    iter_init: IterInitWithValueFn,
}

impl MapLevel {
    /// Validate `shape` as a map level indexed by `key`.
    pub(crate) fn open(shape: &'static Shape, key: KeyField) -> Result<Self, GroupErrorKind> {
        let def = as_map(shape).ok_or(GroupErrorKind::NotAMap)?;
        let (Some(iter_init), Ok(layout)) = (
            def.vtable.iter_vtable.init_with_value,
            shape.layout.sized_layout(),
        ) else {
            return Err(GroupErrorKind::UnsupportedCollection { shape });
        };
        Ok(Self {
            shape,
            def,
            key,
            layout,
            iter_init,
        })
    }

    /// Initialize an empty map of this level's shape in `dst`.
    ///
    /// # Safety
    /// `dst` must be valid for writes of `self.layout`.
    pub(crate) unsafe fn init(&self, dst: PtrUninit, capacity: usize) -> PtrMut {
        unsafe { (self.def.vtable.init_in_place_with_capacity)(dst, capacity) }
    }

    /// Read-only pointer to the value stored under `key`, if any.
    ///
    /// # Safety
    /// `map` must point to an initialized map of this level's shape. The returned pointer is
    /// only valid until the map is next written.
    pub(crate) unsafe fn lookup(&self, map: PtrConst, key: &ScalarKey) -> Option<PtrConst> {
        key.with_ptr(|key_ptr| unsafe { (self.def.vtable.get_value_ptr)(map, key_ptr) })
    }

    /// # Safety
    /// `map` must point to an initialized map of this level's shape.
    pub(crate) unsafe fn len(&self, map: PtrConst) -> usize {
        unsafe { (self.def.vtable.len)(map) }
    }

    /// Insert `value` under `key`, replacing (and dropping) any previous value.
    ///
    /// # Safety
    /// `map` must point to an initialized map of this level's shape, writable by the caller;
    /// `value` must point to an initialized value of the level's value shape, which is moved
    /// into the map.
    pub(crate) unsafe fn insert(&self, map: PtrMut, key: ScalarKey, value: PtrMut) {
        key.into_raw(|key_ptr| unsafe {
            (self.def.vtable.insert)(map, key_ptr, value);
        });
    }

    /// Iterate the `(key, value)` pairs of `map`.
    ///
    /// # Safety
    /// `map` must point to an initialized map of this level's shape that is not written
    /// while the iterator is alive.
    pub(crate) unsafe fn entries(&self, map: PtrConst) -> Entries {
        let vtable: &'static MapVTable = self.def.vtable;
        Entries {
            state: unsafe { (self.iter_init)(map) },
            vtable: &vtable.iter_vtable,
        }
    }
}

/// Iterator over a reflected map's entries. Frees the vtable's iterator state on drop.
pub(crate) struct Entries {
    state: PtrMut,
    vtable: &'static IterVTable<(PtrConst, PtrConst)>,
}

impl Iterator for Entries {
    type Item = (PtrConst, PtrConst);

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: `state` came from this vtable's `init_with_value` and is not freed yet.
        unsafe { (self.vtable.next)(self.state) }
    }
}

impl Drop for Entries {
    fn drop(&mut self) {
        unsafe { (self.vtable.dealloc)(self.state) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::{IntKind, ScalarKind};
    use facet_core::Facet;
    use std::collections::{BTreeMap, HashMap};
    use std::mem::ManuallyDrop;

    type Nested = HashMap<String, BTreeMap<u32, Vec<u8>>>;

    fn level<M: Facet<'static>>(kind: ScalarKind) -> MapLevel {
        let key = KeyField {
            name: "key",
            offset: 0,
            kind,
        };
        MapLevel::open(M::SHAPE, key).unwrap()
    }

    #[test]
    fn counts_map_depth() {
        assert_eq!(map_depth(Nested::SHAPE), 2);
        assert_eq!(map_depth(<HashMap<i64, String>>::SHAPE), 1);
        assert_eq!(map_depth(<Vec<u8>>::SHAPE), 0);
    }

    #[test]
    fn non_maps_do_not_open() {
        let key = KeyField {
            name: "key",
            offset: 0,
            kind: ScalarKind::Text,
        };
        assert!(matches!(
            MapLevel::open(<Vec<String>>::SHAPE, key),
            Err(GroupErrorKind::NotAMap)
        ));
    }

    #[test]
    fn insert_overwrites_existing_value() {
        let level = level::<BTreeMap<u8, String>>(ScalarKind::Int(IntKind::U8));
        let mut out: BTreeMap<u8, String> = BTreeMap::new();
        out.insert(1, "old".to_string());
        let root = PtrMut::new(&mut out as *mut BTreeMap<u8, String>);

        let key = ScalarKey::Int {
            kind: IntKind::U8,
            value: 1,
        };
        let mut value = ManuallyDrop::new(String::from("new"));
        unsafe { level.insert(root, key, PtrMut::new(&mut *value as *mut String)) };

        assert_eq!(out.len(), 1);
        assert_eq!(out[&1], "new");
    }

    #[test]
    fn lookup_misses_absent_keys() {
        let level = level::<HashMap<String, u8>>(ScalarKind::Text);
        let out: HashMap<String, u8> = HashMap::from([("x".to_string(), 1)]);
        let root = PtrConst::new(&out as *const HashMap<String, u8>);

        assert!(unsafe { level.lookup(root, &ScalarKey::from("y")) }.is_none());
        let hit = unsafe { level.lookup(root, &ScalarKey::from("x")) }.unwrap();
        assert_eq!(unsafe { *hit.get::<u8>() }, 1);
        assert_eq!(unsafe { level.len(root) }, 1);
    }

    #[test]
    fn entries_visit_every_pair() {
        let level = level::<Nested>(ScalarKind::Text);
        let mut out: Nested = HashMap::new();
        out.entry("a".to_string()).or_default().insert(1, vec![1]);
        out.entry("b".to_string()).or_default().insert(2, vec![2, 2]);
        let root = PtrConst::new(&out as *const Nested);

        let mut seen: Vec<(String, usize)> = unsafe { level.entries(root) }
            .map(|(key, value)| unsafe {
                (
                    key.get::<String>().clone(),
                    value.get::<BTreeMap<u32, Vec<u8>>>().len(),
                )
            })
            .collect();
        seen.sort();
        assert_eq!(seen, vec![("a".to_string(), 1), ("b".to_string(), 1)]);
    }

    #[test]
    fn init_builds_an_empty_map_off_to_the_side() {
        let outer = level::<Nested>(ScalarKind::Text);
        let inner = level::<BTreeMap<u32, Vec<u8>>>(ScalarKind::Int(IntKind::U32));
        let mut out: Nested = HashMap::new();
        let root = PtrMut::new(&mut out as *mut Nested);

        let slot = crate::scratch::Scratch::new(inner.layout);
        unsafe {
            let child = inner.init(slot.uninit(), 0);
            let mut list = ManuallyDrop::new(vec![7u8]);
            inner.insert(
                child,
                ScalarKey::Int {
                    kind: IntKind::U32,
                    value: 3,
                },
                PtrMut::new(&mut *list as *mut Vec<u8>),
            );
            outer.insert(root, ScalarKey::from("k"), child);
        }

        assert_eq!(out["k"][&3], vec![7]);
    }
}
