//! Scenario to run to results through the facade.

use std::time::Duration;

use afsim::prelude::*;
use afsim_test_utils::scratch;
use serde_json::json;

fn service(root: &std::path::Path) -> AfsimService {
    let config = ServiceConfig {
        scenarios_dir: root.join("scenarios"),
        output_dir: root.join("runs"),
        stop_grace_ms: 500,
        poll_interval_ms: 10,
        ..ServiceConfig::default()
    };
    AfsimService::new(config).unwrap()
}

fn build_scenario(afsim: &AfsimService) -> ScenarioId {
    let id = afsim
        .create_scenario_with(ScenarioSpec {
            description: "two-ship intercept".into(),
            time_step_s: Some(0.5),
            ..ScenarioSpec::new("intercept", 300.0)
        })
        .unwrap()
        .id();
    for (name, lat) in [("blue_1", 38.8), ("red_1", 39.4)] {
        afsim
            .add_platform(id, PlatformSpec::new(name).with_type("F-16").at(lat, -77.0, 9000.0))
            .unwrap();
        let mut params = Parameters::new();
        params.insert("speed".into(), json!(250.0));
        afsim
            .add_component(id, name, ComponentKind::Mover, None, params)
            .unwrap();
    }
    id
}

#[test]
fn scenario_editing_and_persistence() {
    let dir = scratch();
    let afsim = service(dir.path());
    let id = build_scenario(&afsim);

    let err = afsim
        .add_platform(id, PlatformSpec::new("blue_1").at(0.0, 0.0, 0.0))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(afsim.get_platform(id, "blue_1").unwrap().position.latitude, 38.8);

    let slot = afsim
        .add_component(id, "blue_1", ComponentKind::Sensor, None, Parameters::new())
        .unwrap();
    assert_eq!(slot, "sensor_1");
    assert_eq!(afsim.list_components(id, "blue_1").unwrap().len(), 2);
    afsim.remove_component(id, "blue_1", &slot).unwrap();

    let moved = afsim
        .modify_platform(
            id,
            "red_1",
            PlatformUpdate {
                altitude_m: Some(12000.0),
                ..PlatformUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(moved.position.altitude_m, 12000.0);
    let bad = PlatformUpdate {
        latitude: Some(120.0),
        ..PlatformUpdate::default()
    };
    assert_eq!(
        afsim.modify_platform(id, "red_1", bad).unwrap_err().kind(),
        ErrorKind::Validation
    );

    let issues = afsim.validate_scenario(id).unwrap();
    assert!(issues.iter().all(|i| i.severity != Severity::Error), "{issues:?}");

    let path = afsim.save_scenario(id, None).unwrap();
    assert_eq!(path, dir.path().join("scenarios").join("intercept.json"));
    assert_eq!(afsim.list_scenario_files().unwrap(), vec![path.clone()]);
    let saved = afsim.get_scenario(id).unwrap();

    afsim.delete_scenario(id).unwrap();
    assert!(afsim.list_scenarios().is_empty());
    assert_eq!(afsim.get_scenario(id).unwrap_err().kind(), ErrorKind::NotFound);

    let loaded = afsim.load_scenario(&path).unwrap();
    assert_eq!(loaded, saved);
    assert_eq!(afsim.list_platforms(id).unwrap().len(), 2);
    assert!(afsim.render_scenario(id).unwrap().contains("platform red_1"));
}

#[test]
fn dry_run_through_the_facade() {
    let dir = scratch();
    let afsim = service(dir.path());
    let id = build_scenario(&afsim);

    let run = afsim.run_simulation(id, RunOptions::dry_run()).unwrap();
    assert_eq!(run.state(), RunState::Completed);
    assert_eq!(run.scenario_id, id);
    assert_eq!(afsim.list_runs().len(), 1);
    assert!(afsim.list_run_results(run.id(), None).unwrap().is_empty());
    afsim.purge_run(run.id()).unwrap();
    assert_eq!(
        afsim.get_simulation_status(run.id()).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn invalid_scenario_is_refused() {
    let dir = scratch();
    let afsim = service(dir.path());
    let id = build_scenario(&afsim);
    afsim
        .scenarios()
        .update(id, |s| s.name = String::new())
        .unwrap();
    let err = afsim.run_simulation(id, RunOptions::dry_run()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(afsim.list_runs().is_empty());
}

#[cfg(unix)]
#[test]
fn run_and_query_results() {
    use afsim_test_utils::{fake_simulator, FakeBehavior};

    let dir = scratch();
    let afsim = service(dir.path());
    afsim.set_binary(Some(fake_simulator(dir.path(), FakeBehavior::Succeed)));
    let id = build_scenario(&afsim);

    let run = afsim.run_simulation(id, RunOptions::default()).unwrap();
    let run = afsim.wait_for_run(run.id(), Duration::from_secs(10)).unwrap();
    assert_eq!(run.state(), RunState::Completed, "{:?}", run.error);

    let files = afsim.list_run_results(run.id(), None).unwrap();
    let formats: Vec<_> = files.iter().map(|f| f.format).collect();
    assert_eq!(formats.len(), 2, "{files:?}");
    assert!(formats.contains(&ResultFormat::Csv));
    assert!(formats.contains(&ResultFormat::EventLog));
    let csv_only = afsim
        .list_run_results(run.id(), Some(&[ResultFormat::Csv]))
        .unwrap();
    assert_eq!(csv_only.len(), 1);

    let csv = &csv_only[0].path;
    let options = QueryOptions::default().filter(Filter::parse("alt>=9005").unwrap());
    let hits = afsim.query_csv_results(csv, &options).unwrap();
    assert_eq!(hits.records.len(), 1);
    assert_eq!(hits.records[0].get("alt").and_then(FieldValue::as_f64), Some(9010.0));

    let summary = afsim.get_results_summary(csv).unwrap();
    assert_eq!(summary.records, 2);
    assert_eq!(summary.numeric["alt"].max, 9010.0);

    let events = run.output_dir().join("events.evt");
    let all = afsim.query_results(&events, &QueryOptions::default()).unwrap();
    assert_eq!(all.records.len(), 2);
    assert_eq!(
        afsim
            .query_aer_results(&events, &QueryOptions::default())
            .unwrap_err()
            .kind(),
        ErrorKind::Validation
    );

    let export = afsim.export_results_to_json(&events, None).unwrap();
    let back = afsim.read_json_export(&export).unwrap();
    assert_eq!(back.records, all.records);

    let listing = afsim.summarize_directory(run.output_dir()).unwrap();
    assert_eq!(listing.file_count, 2);
}

#[cfg(unix)]
#[test]
fn dropping_the_service_stops_runs() {
    use afsim_test_utils::{fake_simulator, FakeBehavior};

    let dir = scratch();
    let afsim = service(dir.path());
    afsim.set_binary(Some(fake_simulator(dir.path(), FakeBehavior::Sleep(30))));
    let id = build_scenario(&afsim);
    let run = afsim.run_simulation(id, RunOptions::default()).unwrap();
    assert_eq!(run.state(), RunState::Running);

    let stopped = afsim.shutdown();
    assert_eq!(stopped.len(), 1);
    assert_eq!(stopped[0].state(), RunState::Stopped);
}
