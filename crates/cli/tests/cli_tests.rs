//! CLI integration tests

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const CATALOG: &str = r#"{
    "studios": [
        {
            "id": "1", "name": "Rush Games", "employee_count": 1000,
            "release_years": [2001, 2002, 2003, 2004, 2005],
            "games": [[5], [4, 25]],
            "reviews": [{"rating": 2.0, "cons": "constant crunch"}, {"rating": 1.0, "cons": "overtime"}]
        },
        {
            "id": "2", "name": "Blitz Interactive", "employee_count": 500,
            "release_years": [2010, 2011, 2012, 2013],
            "games": [[33]],
            "reviews": [{"rating": 1.5, "cons": "no work-life balance"}]
        },
        {
            "id": "3", "name": "Calm Studio", "employee_count": 1000,
            "release_years": [1995, 2010],
            "games": [[13]],
            "reviews": [{"rating": 4.5, "cons": "slow promotions"}]
        },
        {
            "id": "4", "name": "Zen Works", "employee_count": 200,
            "release_years": [2000, 2012, 2020],
            "games": [[31]],
            "reviews": [{"rating": 5.0, "cons": ""}]
        }
    ]
}"#;

fn crunch(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_crunch"))
        .args(args)
        .arg("--data-dir")
        .arg(data_dir)
        .env("HOME", data_dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute crunch")
}

fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("catalog.json"), CATALOG).unwrap();
    std::fs::create_dir_all(dir.path().join("sets")).unwrap();
    std::fs::write(
        dir.path().join("sets").join("demo.txt"),
        "Rush Games, Blitz Interactive\nCalm Studio, Zen Works\n",
    )
    .unwrap();
    dir
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_crunch"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("crunch risk"), "Should describe the tool");
    for mode in ["print", "save", "predict", "learn", "evaluate"] {
        assert!(stdout.contains(mode), "Should show {} command", mode);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_crunch"))
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("crunch"), "Should show binary name");
}

#[test]
fn test_print_ranks_studios_and_skips_unknown() {
    let dir = fixture();
    let output = crunch(
        dir.path(),
        &["print", "--studio", "Calm", "--studio", "Nobody", "--studio", "Rush", "--format", "json"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let scored = report["scored"].as_array().unwrap();
    assert_eq!(scored.len(), 2);
    assert_eq!(scored[0]["record"]["name"], "Rush");
    assert_eq!(report["failures"][0]["name"], "Nobody");
    assert!(dir.path().join("cache.csv").exists());
}

#[test]
fn test_save_learn_evaluate_round() {
    let dir = fixture();

    let save = crunch(dir.path(), &["save", "--set", "demo"]);
    assert!(save.status.success(), "{}", String::from_utf8_lossy(&save.stderr));
    let data = std::fs::read_to_string(dir.path().join("data").join("data.txt")).unwrap();
    assert_eq!(data.lines().count(), 4);

    let learn = crunch(dir.path(), &["learn"]);
    assert!(learn.status.success(), "{}", String::from_utf8_lossy(&learn.stderr));
    assert!(dir.path().join("models").join("Model-1.txt").exists());

    let evaluate = crunch(dir.path(), &["evaluate", "--model", "Model-1", "--format", "json"]);
    assert!(evaluate.status.success(), "{}", String::from_utf8_lossy(&evaluate.stderr));
    let report: serde_json::Value = serde_json::from_slice(&evaluate.stdout).unwrap();
    assert_eq!(report["accuracy"], 1.0);

    let predict = crunch(
        dir.path(),
        &["predict", "--set", "demo", "--model", "Model-1", "--format", "json"],
    );
    assert!(predict.status.success(), "{}", String::from_utf8_lossy(&predict.stderr));
    let predictions: serde_json::Value = serde_json::from_slice(&predict.stdout).unwrap();
    assert_eq!(predictions.as_array().unwrap().len(), 4);
}

#[test]
fn test_missing_model_fails() {
    let dir = fixture();
    let output = crunch(dir.path(), &["predict", "--studio", "Rush Games", "--model", "Model-7"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Model-7"), "stderr: {}", stderr);
}

#[test]
fn test_learn_without_training_file_fails() {
    let dir = fixture();
    let output = crunch(dir.path(), &["learn", "--data-file", "absent"]);
    assert!(!output.status.success());
}

/// Test print subcommand help
#[test]
fn test_print_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_crunch"))
        .args(["print", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("--studio"));
    assert!(stdout.contains("--set"));
}
