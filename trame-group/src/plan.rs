//! Compiled grouping plans.

use core::fmt::Write as _;
use core::marker::PhantomData;
use std::collections::HashMap;

use facet_core::{Facet, PtrConst, PtrMut, PtrUninit, Shape, StructType};

use crate::batch::Bucket;
use crate::errors::{GroupError, GroupErrorKind};
use crate::levels::{MapLevel, as_map, map_depth};
use crate::merge::{Terminal, TerminalKind, terminal_for};
use crate::scalar::ScalarKey;
use crate::schema::{record_struct, resolve_key};
use crate::scratch::Scratch;

/// Counters for one [`GroupPlan::apply`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupStats {
    /// Records read from the batch.
    pub records: usize,
    /// Intermediate maps created for keys that were not in the output yet.
    pub levels_created: usize,
    /// Terminal collections created for key paths that were not in the output yet.
    pub collections_created: usize,
}

/// A key path validated against a record type `R` and an output type `Out`.
///
/// Compiling checks everything that can go wrong (every error depends only on the two
/// types and the key path), so applying a plan never fails and never leaves the output
/// half-written. A plan can be applied to any number of batches and containers.
pub struct GroupPlan<R, Out> {
    /// One level per key, outermost first.
    levels: Vec<MapLevel>,
    terminal: Terminal,
    _types: PhantomData<fn(R) -> Out>,
}

/// Resolve the key at `index` and make sure `shape` is a map it can index.
fn open_level(
    record: &'static Shape,
    st: &'static StructType,
    shape: &'static Shape,
    index: usize,
    name: &str,
) -> Result<MapLevel, GroupError> {
    let key = resolve_key(record, st, index, name)?;
    MapLevel::open(shape, key).map_err(|kind| GroupError::at_key(shape, index, name, kind))
}

fn check_key_type(level: &MapLevel, index: usize, name: &str) -> Result<(), GroupError> {
    let field = level.key.kind.shape();
    if level.def.k().is_shape(field) {
        return Ok(());
    }
    Err(GroupError::at_key(
        level.shape,
        index,
        name,
        GroupErrorKind::KeyTypeMismatch {
            expected: level.def.k(),
            actual: field,
        },
    ))
}

impl<R, Out> GroupPlan<R, Out>
where
    R: Facet<'static> + Clone,
    Out: Facet<'static>,
{
    /// Validate `key_path` for grouping `R` records into an `Out`.
    ///
    /// Checks run key by key, in path order: the record field, then the level it
    /// indexes, then what that level stores, then the level's key type.
    pub fn compile<S: AsRef<str>>(key_path: &[S]) -> Result<Self, GroupError> {
        let out = Out::SHAPE;
        let Some(last_name) = key_path.last() else {
            return Err(GroupError::at_shape(out, GroupErrorKind::EmptyKeyPath));
        };
        let record = R::SHAPE;
        let st = record_struct::<R>()?;
        let depth = map_depth(out);

        let mut levels = Vec::with_capacity(key_path.len());
        let mut shape = out;
        for (index, name) in key_path.iter().enumerate() {
            let name = name.as_ref();
            let level = open_level(record, st, shape, index, name)?;
            let value = level.def.v();

            if index + 1 < key_path.len() && as_map(value).is_none() {
                return Err(GroupError::at_key(
                    shape,
                    index,
                    name,
                    GroupErrorKind::DepthMismatch {
                        keys: key_path.len(),
                        levels: depth,
                    },
                ));
            }

            check_key_type(&level, index, name)?;
            levels.push(level);
            shape = value;
        }

        let terminal = terminal_for::<R>(shape, key_path.len() - 1, last_name.as_ref(), depth)?;

        tracing::debug!(
            record = record.type_identifier,
            output = out.type_identifier,
            depth = key_path.len(),
            terminal = terminal.kind().as_symbol(),
            "compiled group plan"
        );

        Ok(Self {
            levels,
            terminal,
            _types: PhantomData,
        })
    }

    /// Group `records` into `out`, merging with whatever `out` already holds.
    ///
    /// The batch is bucketed by key path first. Each touched entry of `out` is then
    /// replaced once: stored maps and collections are copied, extended with the batch,
    /// and inserted over the originals.
    pub fn apply<I>(&self, records: I, out: &mut Out) -> GroupStats
    where
        I: IntoIterator<Item = R>,
    {
        let keep_last = self.terminal() == TerminalKind::Slot;
        let mut stats = GroupStats::default();
        let mut batch = Bucket::new();
        for record in records {
            let keys = self.key_path_of(&record);
            batch.file(keys, record, keep_last);
            stats.records += 1;
        }

        let root = PtrMut::new(out as *mut Out);
        // SAFETY: `root` is `out`, whose shape the first level was validated against, and
        // `out` is borrowed mutably for this call.
        unsafe { self.store(0, root, batch.children, &mut stats) };

        tracing::debug!(
            records = stats.records,
            levels_created = stats.levels_created,
            collections_created = stats.collections_created,
            "applied group plan"
        );
        stats
    }

    /// Write the bucketed `entries` into `map`, the map at level `index`.
    ///
    /// # Safety
    /// `map` must point to an initialized map of that level's shape, writable by the caller.
    unsafe fn store(
        &self,
        index: usize,
        map: PtrMut,
        entries: HashMap<ScalarKey, Bucket<R>>,
        stats: &mut GroupStats,
    ) {
        let level = &self.levels[index];
        let Some(child) = self.levels.get(index + 1) else {
            for (key, bucket) in entries {
                let created = unsafe { self.terminal.store(level, map, key, bucket.records) };
                stats.collections_created += created as usize;
            }
            return;
        };

        for (key, bucket) in entries {
            let slot = Scratch::new(child.layout);
            match unsafe { level.lookup(map.as_const(), &key) } {
                Some(existing) => {
                    tracing::trace!(key = %key, level = level.key.name, "copying level");
                    unsafe { self.copy_level(index + 1, existing, slot.uninit()) };
                }
                None => {
                    tracing::trace!(key = %key, level = level.key.name, "creating level");
                    unsafe { child.init(slot.uninit(), bucket.children.len()) };
                    stats.levels_created += 1;
                }
            }
            unsafe {
                self.store(index + 1, slot.ptr(), bucket.children, stats);
                level.insert(map, key, slot.ptr());
            }
        }
    }

    /// Deep-copy the map at level `index` from `src` into `dst`.
    ///
    /// # Safety
    /// `src` must point to an initialized map of that level's shape; `dst` must be valid for
    /// writes of the level's layout and must not overlap `src`.
    unsafe fn copy_level(&self, index: usize, src: PtrConst, dst: PtrUninit) {
        let level = &self.levels[index];
        let map = unsafe { level.init(dst, level.len(src)) };
        let child = self.levels.get(index + 1);

        for (key_ptr, value) in unsafe { level.entries(src) } {
            let key = unsafe { level.key.kind.read(key_ptr.as_byte_ptr()) };
            match child {
                Some(child) => {
                    let slot = Scratch::new(child.layout);
                    unsafe {
                        self.copy_level(index + 1, value, slot.uninit());
                        level.insert(map, key, slot.ptr());
                    }
                }
                None => unsafe { self.terminal.copy_into::<R>(level, map, key, value) },
            }
        }
    }

    /// The key values of `record`, one per level, in key path order.
    pub fn key_path_of(&self, record: &R) -> Vec<ScalarKey> {
        let ptr = record as *const R as *const u8;
        self.levels
            .iter()
            // SAFETY: every key field was resolved against `R`.
            .map(|level| unsafe { level.key.read(ptr) })
            .collect()
    }

    /// Number of keys (and map levels) the plan walks.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// What the last level stores under each key.
    pub fn terminal(&self) -> TerminalKind {
        self.terminal.kind()
    }

    /// Render the plan as an S-expression, one `(map ..)` line per level.
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(&mut out, "(group-plan");
        let _ = writeln!(&mut out, "  (record {})", R::SHAPE.type_identifier);
        let _ = writeln!(&mut out, "  (output {})", Out::SHAPE.type_identifier);
        let _ = writeln!(&mut out, "  (levels");
        for level in &self.levels {
            let _ = writeln!(
                &mut out,
                "    (map (shape {}) (key {}) (kind {}))",
                level.shape.type_identifier,
                level.key.name,
                level.key.kind.as_symbol()
            );
        }
        let _ = writeln!(&mut out, "  )");
        let _ = write!(&mut out, "  (terminal {}))", self.terminal.kind().as_symbol());
        out
    }
}
