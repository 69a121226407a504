use std::path::PathBuf;

use fencepost_harness::structured_log::{LogEmitter, sha256_hex};
use fencepost_harness::{ScenarioRunner, ScenarioSet};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/core.json")
}

fn load() -> ScenarioSet {
    ScenarioSet::from_file(&fixture_path()).expect("core fixture should parse")
}

#[test]
fn core_fixture_scenarios_all_pass() {
    let set = load();
    assert_eq!(set.suite, "core");
    let results = ScenarioRunner::new()
        .run_set(&set, None)
        .expect("core fixture should run");
    assert_eq!(results.len(), set.scenarios.len());

    let failures: Vec<String> = results
        .iter()
        .filter(|r| !r.passed)
        .map(|r| format!("{}:\n{}", r.name, r.diff.clone().unwrap_or_default()))
        .collect();
    assert!(failures.is_empty(), "failing scenarios:\n{}", failures.join("\n"));
}

#[test]
fn core_fixture_names_are_unique() {
    let set = load();
    let mut names: Vec<&str> = set.scenarios.iter().map(|s| s.name.as_str()).collect();
    names.sort_unstable();
    let before = names.len();
    names.dedup();
    assert_eq!(names.len(), before, "duplicate scenario names");
}

#[test]
fn violation_scenarios_report_expected_kinds() {
    let set = load();
    let runner = ScenarioRunner::new();
    let cases = [
        ("double_free", "double_free"),
        ("interior_free", "invalid_free_interior"),
        (
            "unknown_free_inside_released_block",
            "invalid_free_not_allocated",
        ),
        ("foreign_free_outside_heap", "invalid_free_not_in_heap"),
        ("wild_write_after_block", "wild_write"),
    ];
    for (name, label) in cases {
        let results = runner.run_set(&set, Some(name)).expect("scenario runs");
        let result = results
            .iter()
            .find(|r| r.name == name)
            .expect("scenario selected");
        assert_eq!(result.violations, vec![label], "{name}");
    }
}

#[test]
fn logged_run_matches_plain_run() {
    let set = load();
    let mut emitter = LogEmitter::to_sink("test");
    let logged = ScenarioRunner::new()
        .run_set_logged(&set, Some("realloc"), &mut emitter)
        .expect("logged run");
    assert_eq!(logged.len(), 2);
    assert!(logged.iter().all(|r| r.passed));
    // start + end per scenario
    assert_eq!(emitter.emitted(), 4);
}

#[test]
fn fixture_round_trips_through_json() {
    let set = load();
    let json = set.to_json().expect("serialize");
    let again = ScenarioSet::from_json(&json).expect("reparse");
    assert_eq!(again.scenarios.len(), set.scenarios.len());
    assert_eq!(again.scenarios[0].steps, set.scenarios[0].steps);

    let bytes = std::fs::read(fixture_path()).expect("read fixture");
    assert_eq!(sha256_hex(&bytes).len(), 64);
}
