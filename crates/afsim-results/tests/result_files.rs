//! End-to-end behaviour of the result engine over files written to disk.

use std::path::Path;

use afsim_core::{Field, FieldValue, ResultFormat};
use afsim_results::codec::record_type;
use afsim_results::{
    export_results_to_json, get_results_summary, list_result_files, query_aer_results,
    query_csv_results, query_evt_results, read_json_export, AerWriter, Filter, QueryOptions,
};
use afsim_test_utils::{platform_state_csv, EvtBuilder};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────

fn entity_state(i: usize) -> Vec<Field> {
    vec![
        Field {
            name: "platform".into(),
            value: FieldValue::Text(format!("blue_{}", i % 2)),
        },
        Field {
            name: "alt".into(),
            value: FieldValue::Number(100.0 * i as f64),
        },
    ]
}

fn write_aer(path: &Path, n: usize) -> Vec<u8> {
    let mut w = AerWriter::new(Vec::new()).unwrap();
    for i in 0..n {
        w.write_record(record_type::ENTITY_STATE, i as f64, &entity_state(i))
            .unwrap();
    }
    let bytes = w.finish().unwrap();
    std::fs::write(path, &bytes).unwrap();
    bytes
}

fn alt(r: &afsim_core::ResultRecord) -> f64 {
    r.get("alt").and_then(FieldValue::as_f64).unwrap()
}

// ── Binary AER ──────────────────────────────────────────────────

#[test]
fn truncated_aer_drops_only_the_partial_tail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.aer");
    let n = 5;
    let bytes = write_aer(&path, n);
    for cut in [1, 7, 20] {
        std::fs::write(&path, &bytes[..bytes.len() - cut]).unwrap();
        let res = query_aer_results(&path, &QueryOptions::default()).unwrap();
        assert_eq!(res.records.len(), n - 1, "cut {cut}");
        assert!(res.truncated);
        assert_eq!(res.skipped, 0);
        assert_eq!(
            res.records[0].get("record_type"),
            Some(&FieldValue::Text("ENTITY_STATE".into()))
        );
    }
}

#[test]
fn aer_summary_and_filters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.aer");
    write_aer(&path, 10);

    let summary = get_results_summary(&path).unwrap();
    assert_eq!(summary.records, 10);
    assert!(!summary.truncated);
    assert_eq!(summary.fields, ["record_type", "time", "platform", "alt"]);
    assert_eq!(summary.numeric["alt"].max, 900.0);

    let opts = QueryOptions::default()
        .filter(Filter::equals("platform", "blue_1"))
        .filter(Filter::parse("time>=4").unwrap());
    let res = query_aer_results(&path, &opts).unwrap();
    let alts: Vec<_> = res.records.iter().map(alt).collect();
    assert_eq!(alts, [500.0, 700.0, 900.0]);
}

// ── Text formats ────────────────────────────────────────────────

#[test]
fn evt_query_by_event_type() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.evt");
    EvtBuilder::new()
        .comment("generated")
        .event("0", "SIMULATION_STARTING", &[])
        .event("1.0", "PLATFORM_ADDED", &["blue_1", "WSF_PLATFORM", "blue"])
        .event("00:00:05", "WEAPON_FIRED", &["blue_1", "aim120", "red_1"])
        .raw("garbage")
        .event("6", "VENDOR_SPECIFIC", &["x=1", "y"])
        .event("00:00:09.5", "WEAPON_HIT", &["blue_1", "aim120", "red_1", "pk=0.8"])
        .write(&path);

    let weapons = QueryOptions::default().filter(Filter::equals("weapon", "aim120"));
    let res = query_evt_results(&path, &weapons).unwrap();
    assert_eq!(res.matched, 2);
    assert_eq!(res.skipped, 1);
    assert_eq!(res.records[1].get("time"), Some(&FieldValue::Timestamp(9.5)));
    assert_eq!(res.records[1].get("pk"), Some(&FieldValue::Number(0.8)));

    let opaque = query_evt_results(
        &path,
        &QueryOptions::default().filter(Filter::equals("event", "VENDOR_SPECIFIC")),
    )
    .unwrap();
    assert_eq!(
        opaque.records[0].get("payload"),
        Some(&FieldValue::Text("x=1 y".into()))
    );
}

#[test]
fn listing_a_run_directory() {
    let dir = tempfile::tempdir().unwrap();
    platform_state_csv(&dir.path().join("platforms.csv"), 3);
    EvtBuilder::new()
        .event("0", "SIMULATION_STARTING", &[])
        .write(&dir.path().join("sub/events.evt"));
    write_aer(&dir.path().join("replay"), 1);
    std::fs::write(dir.path().join("simulation.log"), "ok").unwrap();

    let formats: Vec<_> = list_result_files(dir.path(), None)
        .unwrap()
        .into_iter()
        .map(|f| f.format)
        .collect();
    assert_eq!(
        formats,
        [ResultFormat::Csv, ResultFormat::BinaryAer, ResultFormat::EventLog]
    );
}

#[test]
fn export_of_every_format_matches_query() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("p.csv");
    platform_state_csv(&csv, 25);
    let evt = dir.path().join("e.evt");
    EvtBuilder::new()
        .event("0", "SIMULATION_STARTING", &[])
        .event("2", "MOVER_UPDATED", &["blue_1", "38.5", "-77.25", "1000"])
        .write(&evt);
    let aer = dir.path().join("r.aer");
    write_aer(&aer, 4);

    for path in [&csv, &evt, &aer] {
        let out = export_results_to_json(path, None).unwrap();
        let export = read_json_export(&out).unwrap();
        let direct =
            afsim_results::query_results(path, &QueryOptions::default().page(0, usize::MAX))
                .unwrap();
        assert_eq!(export.records, direct.records, "{}", path.display());
        assert_eq!(export.record_count, direct.matched);
    }
}

// ── Properties ──────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn csv_filter_then_paginate(n in 0usize..60, lo in 0usize..60, k in 0usize..20, offset in 0usize..10) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.csv");
        platform_state_csv(&path, n);

        let min_alt = 1000.0 + (lo * 10) as f64;
        let opts = QueryOptions::default()
            .filter(Filter::range("alt", Some(min_alt), None))
            .filter(Filter::equals("platform", "blue_0"))
            .page(offset, k);
        let res = query_csv_results(&path, &opts).unwrap();

        let filtered: Vec<f64> = (0..n)
            .filter(|i| i % 3 == 0 && *i >= lo)
            .map(|i| 1000.0 + (i * 10) as f64)
            .collect();
        let expected: Vec<f64> = filtered.iter().copied().skip(offset).take(k).collect();
        prop_assert_eq!(res.matched as usize, filtered.len());
        prop_assert_eq!(res.records.len(), k.min(filtered.len().saturating_sub(offset)));
        prop_assert_eq!(res.records.iter().map(alt).collect::<Vec<_>>(), expected);
    }
}
