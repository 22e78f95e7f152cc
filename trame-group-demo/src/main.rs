//! Groups a few sample rows by `val` then `id` and logs the result.
//!
//! Run with `RUST_LOG=debug` to see plan compilation, or `trace` for every created level.

use std::collections::HashMap;
use std::process::ExitCode;

use facet::Facet;
use trame_group::{GroupError, GroupPlan};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, Facet)]
struct Row {
    id: i64,
    val: String,
}

type ByValThenId = HashMap<String, HashMap<i64, Vec<Row>>>;

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), GroupError> {
    let rows = vec![
        Row { id: 1, val: "val".into() },
        Row { id: 1, val: "val".into() },
        Row { id: 3, val: "val".into() },
        Row { id: 4, val: "val2".into() },
        Row { id: 3, val: "val2".into() },
    ];

    let plan = GroupPlan::<Row, ByValThenId>::compile(&["val", "id"])?;
    tracing::debug!("\n{}", plan.to_sexp());

    let mut out = ByValThenId::new();
    let stats = plan.apply(rows, &mut out);
    tracing::info!(
        records = stats.records,
        levels = stats.levels_created,
        collections = stats.collections_created,
        "grouped"
    );

    let mut vals: Vec<_> = out.iter().collect();
    vals.sort_by(|a, b| a.0.cmp(b.0));
    for (val, by_id) in vals {
        let mut ids: Vec<_> = by_id.iter().collect();
        ids.sort_by_key(|(id, _)| **id);
        for (id, group) in ids {
            tracing::info!(val = %val, id, count = group.len(), "{group:?}");
        }
    }

    // A key path that does not fit the output type is reported before anything is written.
    if let Err(e) = trame_group::reduce(Vec::<Row>::new(), &mut out, &["id"]) {
        tracing::warn!("rejected as expected: {e}");
    }

    Ok(())
}
