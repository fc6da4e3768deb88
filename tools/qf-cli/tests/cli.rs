// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of QuatField — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::fs;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::tempdir;

const SMALL_GRID: [&str; 8] = ["--lx", "8", "--ly", "8", "--dt", "0.05", "--t-total", "2"];

fn run_cli(args: &[&str]) -> Output {
    let output = Command::new(env!("CARGO_BIN_EXE_qf"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "qf {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn run_writes_scalar_series() {
    let dir = tempdir().unwrap();
    let output_path = dir.path().join("reports/run.json");
    let mut args = vec![
        "run",
        "--scenario",
        "degenerative",
        "--seed",
        "7",
        "--save-interval",
        "10",
        "--output",
        output_path.to_str().unwrap(),
    ];
    args.extend(SMALL_GRID);
    let output = run_cli(&args);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("final chi"), "unexpected stdout: {stdout}");

    let report = read_json(&output_path);
    assert_eq!(report["scenario"], "degenerative");
    assert_eq!(report["seed"], 7);
    assert_eq!(report["parameters"]["alpha_D"], 0.1);
    // 40 steps saved every 10th.
    assert_eq!(report["series"]["collapse_metric"].as_array().unwrap().len(), 4);
    assert!((report["series"]["time"][1].as_f64().unwrap() - 0.5).abs() < 1e-12);
    assert!(report.get("snapshots").is_none());
}

#[test]
fn run_full_report_includes_snapshots() {
    let dir = tempdir().unwrap();
    let output_path = dir.path().join("full.json");
    let mut args = vec![
        "run",
        "--scenario",
        "treatment",
        "--save-interval",
        "20",
        "--full",
        "--output",
        output_path.to_str().unwrap(),
    ];
    args.extend(SMALL_GRID);
    run_cli(&args);

    let report = read_json(&output_path);
    let snapshots = report["snapshots"].as_array().unwrap();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[1]["step"], 20);
    assert_eq!(snapshots[0]["field"]["dim"], serde_json::json!([4, 8, 8]));
}

#[test]
fn run_accepts_a_config_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("run.json");
    let output_path = dir.path().join("out.json");
    fs::write(
        &config_path,
        r#"{
            "simulation": { "lx": 6, "ly": 6, "dx": 1, "dt": 0.05, "t_total": 1 },
            "scenario": "healthy",
            "seed": 3,
            "save_interval": 5,
            "parameters": {
                "D_Q": 0.01, "alpha_D": 0.7, "alpha_A": 0.4, "beta_E": 0.2,
                "gamma_0": 0.1, "gamma_1": 0.05, "gamma_2": 0.05, "gamma_3": 0.05
            }
        }"#,
    )
    .unwrap();

    run_cli(&[
        "run",
        "--config",
        config_path.to_str().unwrap(),
        "--output",
        output_path.to_str().unwrap(),
    ]);

    let report = read_json(&output_path);
    assert_eq!(report["seed"], 3);
    assert_eq!(report["parameters"]["alpha_D"], 0.7);
    assert_eq!(report["save_interval"], 5);
    assert_eq!(report["series"]["time"].as_array().unwrap().len(), 4);
}

#[test]
fn unknown_scenario_is_rejected() {
    let output = Command::new(env!("CARGO_BIN_EXE_qf"))
        .args(["run", "--scenario", "recovering"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("recovering"), "unexpected stderr: {stderr}");
}

#[test]
fn compare_reports_every_scenario() {
    let dir = tempdir().unwrap();
    let output_path = dir.path().join("compare.json");
    let mut args = vec!["compare", "--seed", "11", "--output", output_path.to_str().unwrap()];
    args.extend(SMALL_GRID);
    let output = run_cli(&args);

    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["healthy", "degenerative", "treatment"] {
        assert!(stdout.contains(name), "missing {name} in {stdout}");
    }

    let report = read_json(&output_path);
    let members = report["members"].as_array().unwrap();
    let labels: Vec<&str> = members.iter().map(|m| m["label"].as_str().unwrap()).collect();
    assert_eq!(labels, ["healthy", "degenerative", "treatment"]);
    assert!(members.iter().all(|m| m["final_collapse_metric"].is_number()));
    assert!(report["separated"].is_boolean());
    assert_eq!(report["separation"]["margin"], 0.1);
}

#[test]
fn ablate_lists_seven_configurations() {
    let dir = tempdir().unwrap();
    let output_path = dir.path().join("ablation.json");
    let mut args = vec!["ablate", "--sequential", "--seed", "5", "--output", output_path.to_str().unwrap()];
    args.extend(SMALL_GRID);
    let output = run_cli(&args);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ranking:"));

    let report = read_json(&output_path);
    let outcomes = report["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 7);
    assert_eq!(outcomes[0]["config"], "A1");
    assert_eq!(outcomes[6]["config"], "A7");
    assert_eq!(report["ranking"].as_array().unwrap().len(), 7);
    assert!(report["ordering_holds"].is_boolean());
}

#[test]
fn basin_reports_every_scenario_spread() {
    let dir = tempdir().unwrap();
    let output_path = dir.path().join("basin.json");
    let mut args = vec![
        "basin",
        "--samples",
        "3",
        "--seed",
        "4",
        "--output",
        output_path.to_str().unwrap(),
    ];
    args.extend(SMALL_GRID);
    let output = run_cli(&args);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("degenerative lowest:"), "unexpected stdout: {stdout}");

    let report = read_json(&output_path);
    assert_eq!(report["samples"], 3);
    assert_eq!(report["seed"], 4);
    for name in ["healthy", "degenerative", "treatment"] {
        assert!(report[name]["mean"].is_number(), "missing {name} in {report}");
        assert!(report[name]["std"].as_f64().unwrap() >= 0.0);
    }
    assert!(report["degenerative_lowest"].is_boolean());
}

#[test]
fn robustness_sweeps_requested_levels() {
    let dir = tempdir().unwrap();
    let output_path = dir.path().join("robustness.json");
    let mut args = vec![
        "robustness",
        "--sequential",
        "--trials",
        "2",
        "--levels",
        "0,0.1",
        "--output",
        output_path.to_str().unwrap(),
    ];
    args.extend(SMALL_GRID);
    let output = run_cli(&args);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ordering preserved at every level:"), "unexpected stdout: {stdout}");

    let report = read_json(&output_path);
    assert_eq!(report["trials"], 2);
    let levels = report["levels"].as_array().unwrap();
    assert_eq!(levels.len(), 2);
    assert_eq!(levels[0]["level"], 0.0);
    assert_eq!(levels[1]["level"], 0.1);
    assert!(levels.iter().all(|l| l["treatment"]["mean"].is_number()));
    let every = levels.iter().all(|l| l["ordering_preserved"].as_bool().unwrap());
    assert_eq!(report["all_preserved"], every);
}

#[test]
fn robustness_rejects_out_of_range_levels() {
    let mut args = vec!["robustness", "--trials", "1", "--levels", "1.5"];
    args.extend(SMALL_GRID);
    let output = Command::new(env!("CARGO_BIN_EXE_qf"))
        .args(&args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("perturbation level"), "unexpected stderr: {stderr}");
}
