use facet::Facet;
use std::collections::{BTreeMap, HashMap};
use trame_group::{GroupPlan, TerminalKind, reduce};

#[derive(Debug, Clone, PartialEq, Facet)]
struct Reading {
    sensor: String,
    minute: u32,
    value: i64,
}

fn reading(sensor: &str, minute: u32, value: i64) -> Reading {
    Reading {
        sensor: sensor.to_string(),
        minute,
        value,
    }
}

#[test]
fn last_record_wins_per_key() {
    let readings = vec![
        reading("a", 0, 10),
        reading("b", 0, 20),
        reading("a", 1, 11),
        reading("a", 2, 12),
    ];

    let mut out: HashMap<String, Reading> = HashMap::new();
    reduce(readings, &mut out, &["sensor"]).unwrap();

    assert_eq!(out.len(), 2);
    assert_eq!(out["a"], reading("a", 2, 12));
    assert_eq!(out["b"], reading("b", 0, 20));
}

#[test]
fn nested_slots_keep_latest_per_full_path() {
    let readings = vec![
        reading("a", 0, 1),
        reading("a", 0, 2),
        reading("a", 1, 3),
        reading("b", 0, 4),
        reading("a", 0, 5),
    ];

    let mut out: BTreeMap<String, BTreeMap<u32, Reading>> = BTreeMap::new();
    reduce(readings, &mut out, &["sensor", "minute"]).unwrap();

    assert_eq!(out["a"][&0].value, 5);
    assert_eq!(out["a"][&1].value, 3);
    assert_eq!(out["b"][&0].value, 4);
}

#[test]
fn slot_overwrites_prepopulated_value() {
    let mut out: HashMap<String, Reading> = HashMap::new();
    out.insert("a".to_string(), reading("a", 99, -1));
    out.insert("z".to_string(), reading("z", 0, 0));

    reduce(vec![reading("a", 1, 7)], &mut out, &["sensor"]).unwrap();

    assert_eq!(out["a"], reading("a", 1, 7));
    assert_eq!(out["z"], reading("z", 0, 0));
}

#[test]
fn slot_plan_reports_slot_terminal() {
    let plan = GroupPlan::<Reading, HashMap<String, HashMap<u32, Reading>>>::compile(&[
        "sensor", "minute",
    ])
    .unwrap();
    assert_eq!(plan.terminal(), TerminalKind::Slot);

    let mut out = HashMap::new();
    let stats = plan.apply(vec![reading("a", 0, 1), reading("a", 0, 2)], &mut out);
    assert_eq!(stats.records, 2);
    assert_eq!(stats.levels_created, 1);
    assert_eq!(stats.collections_created, 0);
    assert_eq!(out["a"][&0].value, 2);
}
