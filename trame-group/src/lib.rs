//! # trame-group
//!
//! Multi-key grouping of facet records into caller-shaped nested maps.
//!
//! Given records of a struct type `R` and a key path of field names, [`reduce`] files
//! every record under the nested map entry its field values name. The output type decides
//! the shape: `HashMap<String, BTreeMap<i64, Vec<R>>>` groups by two keys into record
//! lists, `HashMap<i64, R>` keeps the last record per key.
//!
//! ```ignore
//! let mut out: HashMap<String, HashMap<i64, Vec<Row>>> = HashMap::new();
//! trame_group::reduce(rows, &mut out, &["val", "id"])?;
//! ```
//!
//! Record fields and container levels are discovered through facet shapes: keys must be
//! integer or `String` fields, and each map level's key type must be exactly the type of
//! the field indexing it.

// --- errors ---
mod errors;
pub use errors::{ErrorLocation, GroupError, GroupErrorKind, KeyPosition};

// --- scalar ---
mod scalar;
pub use scalar::{IntKind, ScalarKey, ScalarKind};

// --- schema ---
mod schema;
pub use schema::KeyField;

// --- levels ---
mod levels;

// --- batch ---
mod batch;

// --- merge ---
mod merge;
pub use merge::TerminalKind;

// --- scratch ---
mod scratch;

// --- plan ---
mod plan;
pub use plan::{GroupPlan, GroupStats};

use facet_core::Facet;

/// Group `records` into `out` by the fields named in `key_path`, outermost level first.
///
/// Intermediate maps are created on demand. Records sharing a full key path are appended
/// to the existing collection in input order, or overwrite the existing slot. Entries
/// already in `out` are kept and merged into; a stored collection that receives records
/// is replaced by a copy extended with the new records.
///
/// On error nothing is written to `out`.
#[tracing::instrument(level = "debug", skip_all, fields(keys = key_path.len()))]
pub fn reduce<R, Out, S>(
    records: impl IntoIterator<Item = R>,
    out: &mut Out,
    key_path: &[S],
) -> Result<(), GroupError>
where
    R: Facet<'static> + Clone,
    Out: Facet<'static>,
    S: AsRef<str>,
{
    let plan = GroupPlan::<R, Out>::compile(key_path)?;
    plan.apply(records, out);
    Ok(())
}

/// Like [`reduce`], into a fresh `Out::default()` that is returned on success.
pub fn group<R, Out, S>(
    records: impl IntoIterator<Item = R>,
    key_path: &[S],
) -> Result<Out, GroupError>
where
    R: Facet<'static> + Clone,
    Out: Facet<'static> + Default,
    S: AsRef<str>,
{
    let mut out = Out::default();
    reduce(records, &mut out, key_path)?;
    Ok(out)
}
