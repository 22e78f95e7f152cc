use divan::{Bencher, black_box};
use facet::Facet;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use trame_group::GroupPlan;

#[derive(Debug, Clone, PartialEq, Facet)]
struct SampleRow {
    id: u32,
    region: String,
    amount: i64,
}

const BATCH_SIZE: usize = 512;

fn make_rows() -> Vec<SampleRow> {
    (0..BATCH_SIZE)
        .map(|i| SampleRow {
            id: (i as u32 * 17 + 3) % 64,
            region: format!("region-{}", i % 8),
            amount: i as i64,
        })
        .collect()
}

type Nested = HashMap<String, HashMap<u32, Vec<SampleRow>>>;

static ROWS: LazyLock<Vec<SampleRow>> = LazyLock::new(make_rows);

#[divan::bench]
fn reflective_plan(bencher: Bencher) {
    let plan = GroupPlan::<SampleRow, Nested>::compile(&["region", "id"]).expect("plan compile");
    let plan = &plan;
    bencher
        .with_inputs(|| ROWS.clone())
        .bench_values(|rows| {
            let mut out = Nested::new();
            plan.apply(rows, &mut out);
            black_box(out)
        });
}

#[divan::bench]
fn reflective_compile_and_apply(bencher: Bencher) {
    bencher
        .with_inputs(|| ROWS.clone())
        .bench_values(|rows| {
            let mut out = Nested::new();
            trame_group::reduce(rows, &mut out, &["region", "id"]).expect("reduce should succeed");
            black_box(out)
        });
}

#[divan::bench]
fn handwritten_entry_api(bencher: Bencher) {
    bencher
        .with_inputs(|| ROWS.clone())
        .bench_values(|rows| {
            let mut out = Nested::new();
            for row in rows {
                out.entry(row.region.clone())
                    .or_default()
                    .entry(row.id)
                    .or_default()
                    .push(row);
            }
            black_box(out)
        });
}

#[divan::bench]
fn reflective_btree_slots(bencher: Bencher) {
    bencher
        .with_inputs(|| ROWS.clone())
        .bench_values(|rows| {
            let mut out: BTreeMap<u32, SampleRow> = BTreeMap::new();
            trame_group::reduce(rows, &mut out, &["id"]).expect("reduce should succeed");
            black_box(out)
        });
}

fn main() {
    divan::main();
}
