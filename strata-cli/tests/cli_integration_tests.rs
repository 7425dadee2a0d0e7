//! CLI integration tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn switch_task() -> &'static str {
    r#"{
        "domain": {
            "name": "switch",
            "predicates": [
                {"name": "off", "arity": 1},
                {"name": "on", "arity": 1}
            ],
            "actions": [{
                "name": "flip",
                "parameters": ["s"],
                "precondition": {"literals": [{"predicate": "off", "args": ["s"]}]},
                "effects": [{
                    "add": [{"predicate": "on", "args": ["s"]}],
                    "del": [{"predicate": "off", "args": ["s"]}]
                }]
            }]
        },
        "objects": ["s1", "s2"],
        "init": {"atoms": [
            {"predicate": "off", "args": ["s1"]},
            {"predicate": "off", "args": ["s2"]}
        ]},
        "goal": [{"predicate": "on", "args": ["s1"]}]
    }"#
}

fn write_task(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("task.json");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(switch_task().as_bytes()).unwrap();
    path
}

#[test]
fn test_ground_text_output() {
    let dir = tempfile::tempdir().unwrap();
    let task = write_task(&dir);

    Command::cargo_bin("strata")
        .unwrap()
        .arg("ground")
        .arg(&task)
        .assert()
        .success()
        .stdout(predicate::str::contains("ground actions: 2"))
        .stdout(predicate::str::contains("fluent atoms:   4"));
}

#[test]
fn test_ground_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let task = write_task(&dir);

    let output = Command::cargo_bin("strata")
        .unwrap()
        .args(["ground", "--format", "json"])
        .arg(&task)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["num_ground_actions"], 2);
    assert_eq!(report["num_action_schemas"], 1);
}

#[test]
fn test_heuristic_ff_with_plan() {
    let dir = tempfile::tempdir().unwrap();
    let task = write_task(&dir);
    let plan = dir.path().join("plan.txt");

    Command::cargo_bin("strata")
        .unwrap()
        .args(["heuristic", "--kind", "ff", "--plan-out"])
        .arg(&plan)
        .arg(&task)
        .assert()
        .success()
        .stdout(predicate::str::contains("1"));

    let text = std::fs::read_to_string(&plan).unwrap();
    assert!(text.contains("(flip s1)"));
    assert!(text.contains("; cost = 1 (unit cost)"));
}

#[test]
fn test_successors() {
    let dir = tempfile::tempdir().unwrap();
    let task = write_task(&dir);

    Command::cargo_bin("strata")
        .unwrap()
        .arg("successors")
        .arg(&task)
        .assert()
        .success()
        .stdout(predicate::str::contains("(flip s1)"))
        .stdout(predicate::str::contains("(flip s2)"))
        .stdout(predicate::str::contains("; 2 applicable actions"));
}

#[test]
fn test_missing_file_fails() {
    Command::cargo_bin("strata")
        .unwrap()
        .args(["ground", "/nonexistent/task.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading task file"));
}
