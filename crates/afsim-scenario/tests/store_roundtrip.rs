//! Save/load behaviour of the scenario store against real files.

use afsim_core::{ComponentKind, ErrorKind, Parameters, PlatformSpec, Scenario};
use afsim_scenario::{has_errors, ScenarioSpec, ScenarioStore};
use afsim_test_utils::sample_scenario;
use proptest::prelude::*;
use serde_json::json;

#[test]
fn create_then_validate_has_no_errors() {
    let store = ScenarioStore::new("unused");
    let s = store
        .create_with(ScenarioSpec {
            name: "alpha".into(),
            description: "d".into(),
            duration_s: 120.0,
            time_step_s: Some(0.5),
        })
        .unwrap();
    let issues = store.validate(s.id()).unwrap();
    assert!(!has_errors(&issues));
}

#[test]
fn save_defaults_to_scenarios_dir_and_records_path() {
    let dir = tempfile::tempdir().unwrap();
    let store = ScenarioStore::new(dir.path().join("scenarios"));
    let id = store.create("alpha", 60.0).unwrap().id();
    let path = store.save(id, None).unwrap();
    assert_eq!(path, dir.path().join("scenarios/alpha.json"));
    assert_eq!(store.get(id).unwrap().file_path, Some(path.clone()));
    assert_eq!(store.list_files().unwrap(), vec![path]);
}

#[test]
fn load_replaces_registered_scenario_with_same_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = ScenarioStore::new(dir.path());
    let id = store.create("alpha", 60.0).unwrap().id();
    let path = store.save(id, None).unwrap();

    store
        .edit(id, |em| em.add_platform(PlatformSpec::new("late")).map(|_| ()))
        .unwrap();
    assert_eq!(store.get(id).unwrap().platform_count(), 1);

    let loaded = store.load(&path).unwrap();
    assert_eq!(loaded.id(), id);
    assert_eq!(store.list().len(), 1);
    assert_eq!(store.get(id).unwrap().platform_count(), 0);
}

#[test]
fn afsim_text_save_and_import() {
    let dir = tempfile::tempdir().unwrap();
    let store = ScenarioStore::new(dir.path());
    let src = sample_scenario("intercept");
    let json_path = dir.path().join("intercept.json");
    afsim_scenario::persist::write(&src, &json_path).unwrap();
    let id = store.load(&json_path).unwrap().id();

    let text_path = dir.path().join("intercept.afsim");
    store.save(id, Some(&text_path)).unwrap();
    let rendered = std::fs::read_to_string(&text_path).unwrap();
    assert_eq!(rendered, store.render(id).unwrap());

    let imported = store.load(&text_path).unwrap();
    assert_ne!(imported.id(), id);
    assert_eq!(store.list().len(), 2);
    assert_eq!(imported.platform_count(), 2);
    let blue = imported.platform("blue_1").unwrap();
    assert_eq!(blue.components().count(), 3);
    assert_eq!(blue.mover().unwrap().type_tag, "wsf_air_mover");
}

#[test]
fn load_errors_are_classified() {
    let dir = tempfile::tempdir().unwrap();
    let store = ScenarioStore::new(dir.path());
    let missing = store.load(&dir.path().join("nope.json")).unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "[1, 2").unwrap();
    assert_eq!(store.load(&bad).unwrap_err().kind(), ErrorKind::Parse);

    let dup = dir.path().join("dup.afsim");
    std::fs::write(&dup, "platform a\nend_platform\nplatform a\nend_platform\n").unwrap();
    assert_eq!(store.load(&dup).unwrap_err().kind(), ErrorKind::Parse);
}

#[test]
fn list_files_ignores_other_files_and_missing_dir() {
    let dir = tempfile::tempdir().unwrap();
    let store = ScenarioStore::new(dir.path().join("absent"));
    assert!(store.list_files().unwrap().is_empty());

    let store = ScenarioStore::new(dir.path());
    std::fs::write(dir.path().join("b.afsim"), "").unwrap();
    std::fs::write(dir.path().join("a.json"), "{}").unwrap();
    std::fs::write(dir.path().join("notes.md"), "").unwrap();
    let names: Vec<_> = store
        .list_files()
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["a.json", "b.afsim"]);
}

// ── Round trip ──────────────────────────────────────────────────

fn arb_kind() -> impl Strategy<Value = ComponentKind> {
    prop_oneof![
        Just(ComponentKind::Mover),
        Just(ComponentKind::Sensor),
        Just(ComponentKind::Weapon),
        Just(ComponentKind::Other),
    ]
}

#[derive(Debug, Clone)]
struct PlatformDraft {
    lat: f64,
    lon: f64,
    alt: f64,
    type_tag: Option<String>,
    speed: Option<f64>,
    components: Vec<(ComponentKind, Option<String>, i64)>,
}

fn arb_platform() -> impl Strategy<Value = PlatformDraft> {
    (
        -90.0f64..=90.0,
        -180.0f64..=180.0,
        -500.0f64..50_000.0,
        prop::option::of("[A-Z_]{3,12}"),
        prop::option::of(0.0f64..1000.0),
        prop::collection::vec(
            (arb_kind(), prop::option::of("wsf_[a-z_]{3,10}"), any::<i64>()),
            0..5,
        ),
    )
        .prop_map(|(lat, lon, alt, type_tag, speed, components)| PlatformDraft {
            lat,
            lon,
            alt,
            type_tag,
            speed,
            components,
        })
}

fn build(duration: f64, step: f64, drafts: &[PlatformDraft]) -> Scenario {
    let mut s = Scenario::new("prop", duration)
        .unwrap()
        .with_time_step(step)
        .unwrap()
        .with_description("generated");
    s.metadata.insert("n".into(), json!(drafts.len()));
    let mut em = afsim_core::EntityManager::new(&mut s);
    for (i, d) in drafts.iter().enumerate() {
        let name = format!("p{i}");
        let mut spec = PlatformSpec::new(&name).at(d.lat, d.lon, d.alt);
        if let Some(t) = &d.type_tag {
            spec = spec.with_type(t.clone());
        }
        if let Some(v) = d.speed {
            spec = spec.param("speed", v);
        }
        em.add_platform(spec).unwrap();
        for (kind, tag, n) in &d.components {
            let mut params = Parameters::new();
            params.insert("n".into(), json!(n));
            // A second mover is rejected; that is expected and skipped.
            let _ = em.add_component(&name, *kind, tag.clone(), params);
        }
    }
    s
}

proptest! {
    #[test]
    fn save_load_preserves_every_field(
        duration in 0.001f64..1e7,
        step in 0.001f64..100.0,
        drafts in prop::collection::vec(arb_platform(), 0..6),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let store = ScenarioStore::new(dir.path());
        let original = build(duration, step, &drafts);
        let path = dir.path().join("prop.json");
        afsim_scenario::persist::write(&original, &path).unwrap();

        let loaded = store.load(&path).unwrap();
        let mut expected = original.clone();
        expected.file_path = Some(path.clone());
        prop_assert_eq!(&loaded, &expected);

        let again = store.save(loaded.id(), None).unwrap();
        let reloaded = store.load(&again).unwrap();
        expected.file_path = Some(again);
        prop_assert_eq!(reloaded, expected);
    }
}
