use assert_cmd::Command;
use predicates::prelude::*;
use std::fmt::Write as _;
use std::path::Path;
use tempfile::TempDir;

fn cadence() -> Command {
    Command::cargo_bin("cadence").unwrap()
}

const SECONDS: usize = 20;
const RATE: usize = 100;

/// 20 s recording: acc_y = 5 sin(pi t) at 100 Hz, GPS at 1 Hz moving 2 m/s
fn write_recording(dir: &Path, with_gyro: bool) {
    let mut accel = String::from("time,seconds_elapsed,z,y,x\n");
    let mut gyro = String::from("time,seconds_elapsed,z,y,x\n");
    for i in 0..SECONDS * RATE {
        let t = i as f64 / RATE as f64;
        let time = i as i64 * 10_000_000;
        let y = 5.0 * (std::f64::consts::PI * t).sin();
        writeln!(accel, "{},{},9.81,{},0.0", time, t, y).unwrap();
        writeln!(gyro, "{},{},0.0,0.0,0.0", time, t).unwrap();
    }
    let mut location = String::from("time,seconds_elapsed,latitude,longitude,altitude,speed\n");
    for s in 0..=SECONDS {
        writeln!(
            location,
            "{},{},46.0,7.0,{},2.0",
            s as i64 * 1_000_000_000,
            s,
            2000.0 - s as f64
        )
        .unwrap();
    }

    std::fs::write(dir.join("Accelerometer.csv"), accel).unwrap();
    std::fs::write(dir.join("AccelerometerUncalibrated.csv"), "garbage").unwrap();
    std::fs::write(dir.join("Location.csv"), location).unwrap();
    std::fs::write(dir.join("Metadata.csv"), "version,device name\n1,Test Phone\n").unwrap();
    if with_gyro {
        std::fs::write(dir.join("Gyroscope.csv"), gyro).unwrap();
    }
}

fn recording() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_recording(dir.path(), true);
    dir
}

const UP_DOWN_PLAN: &str = r#"{
    "detections": [
        { "name": "up", "channel": "acc_y", "threshold": 2.0, "window": 100, "direction": "pos" },
        { "name": "down", "channel": "acc_y", "threshold": 2.0, "window": 100, "direction": "neg" }
    ],
    "cycles": { "start": "up", "mid": "down", "end": "up" }
}"#;

fn write_plan(dir: &Path, body: &str) -> String {
    let path = dir.join("plan.json");
    std::fs::write(&path, body).unwrap();
    path.to_str().unwrap().to_string()
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// =============================================================================
// GENERAL
// =============================================================================

#[test]
fn test_no_args_shows_help() {
    cadence()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    cadence()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cadence"));
}

#[test]
fn test_help_flag() {
    cadence()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze cycles"));
}

// =============================================================================
// FILTERS SUBCOMMAND
// =============================================================================

#[test]
fn test_filters_table() {
    cadence()
        .arg("filters")
        .assert()
        .success()
        .stdout(predicate::str::contains("butterworth"))
        .stdout(predicate::str::contains("gcv_spline"))
        .stdout(predicate::str::contains("Kernel Size"));
}

#[test]
fn test_filters_json() {
    let output = cadence().args(["filters", "--json"]).assert().success();
    let parsed = stdout_json(output.get_output());
    let selectors: Vec<&str> = parsed
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["selector"].as_str().unwrap())
        .collect();
    assert_eq!(selectors.len(), 8);
    assert!(selectors.contains(&"savitzky_golay"));
}

// =============================================================================
// VALIDATE SUBCOMMAND
// =============================================================================

#[test]
fn test_validate_recording() {
    let dir = recording();
    cadence()
        .args(["validate", "--dir", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("2000 accel"));
}

#[test]
fn test_validate_missing_gyroscope() {
    let dir = tempfile::tempdir().unwrap();
    write_recording(dir.path(), false);
    let output = cadence()
        .args(["validate", "--json", "--dir", dir.path().to_str().unwrap()])
        .assert()
        .code(1);
    let parsed = stdout_json(output.get_output());
    assert_eq!(parsed["missing"], serde_json::json!(["Gyroscope"]));
}

#[test]
fn test_validate_nonexistent_folder() {
    cadence()
        .args(["validate", "--dir", "/nonexistent/recording"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

// =============================================================================
// PROCESS SUBCOMMAND
// =============================================================================

#[test]
fn test_process_channel_subset() {
    let dir = recording();
    let output = cadence()
        .args(["process", "--compact", "--channels", "acc_y", "gyro_mag"])
        .args(["--dir", dir.path().to_str().unwrap()])
        .assert()
        .success();
    let parsed = stdout_json(output.get_output());
    assert_eq!(parsed["samples"], 2000);
    let channels = parsed["channels"].as_object().unwrap();
    assert_eq!(channels.len(), 2);
    assert_eq!(channels["acc_y"].as_array().unwrap().len(), 2000);
    let rate = parsed["sample_rate"].as_f64().unwrap();
    let expected = 2000.0 / 19.99;
    assert!((rate - expected).abs() < 1e-9, "rate {}", rate);
}

#[test]
fn test_process_single_sample() {
    let dir = recording();
    let output = cadence()
        .args(["process", "--filter", "median", "--param1", "5", "--sample", "150"])
        .args(["--dir", dir.path().to_str().unwrap()])
        .assert()
        .success();
    let parsed = stdout_json(output.get_output());
    assert_eq!(parsed["sample"]["index"], 150);
    assert_eq!(parsed["config"]["filter"]["kind"], "median");
    assert!(parsed.get("channels").is_none());
}

#[test]
fn test_process_sample_out_of_range() {
    let dir = recording();
    cadence()
        .args(["process", "--sample", "99999", "--dir", dir.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("outside"));
}

#[test]
fn test_process_unknown_channel() {
    let dir = recording();
    cadence()
        .args(["process", "--channels", "speed", "--dir", dir.path().to_str().unwrap()])
        .assert()
        .code(1);
}

// =============================================================================
// ANALYZE SUBCOMMAND
// =============================================================================

#[test]
fn test_analyze_without_plan() {
    let dir = recording();
    let output = cadence()
        .args(["analyze", "--quiet", "--dir", dir.path().to_str().unwrap()])
        .assert()
        .success();
    let parsed = stdout_json(output.get_output());
    assert_eq!(parsed["recording"]["device"], "Test Phone");
    assert_eq!(parsed["active_section"], "full");
    assert!(parsed["events"].as_array().unwrap().is_empty());
    assert!(parsed["analysis"].is_null());
    let distance = parsed["track"]["distance_m"].as_f64().unwrap();
    assert!((distance - 40.0).abs() < 1e-9);
}

#[test]
fn test_analyze_plan_with_report() {
    let dir = recording();
    let plan = write_plan(dir.path(), UP_DOWN_PLAN);
    let report = dir.path().join("report.csv");
    let output = cadence()
        .args(["analyze", "--quiet", "--plan", &plan])
        .args(["--dir", dir.path().to_str().unwrap()])
        .args(["--report", report.to_str().unwrap()])
        .assert()
        .success();

    let parsed = stdout_json(output.get_output());
    let stats = &parsed["analysis"]["statistics"];
    assert_eq!(stats["count"], 9);
    let mean = stats["mean_duration"].as_f64().unwrap();
    assert!((mean - 2.0).abs() < 0.05, "mean {}", mean);
    assert!(stats["mean_phase1"].as_f64().is_some());
    assert_eq!(parsed["events"].as_array().unwrap().len(), 2);

    let text = std::fs::read_to_string(&report).unwrap();
    assert!(text.starts_with('\u{FEFF}'));
    assert!(text.contains("Device,Test Phone"));
    assert!(text.contains("No sections recorded."));
    assert!(text.contains("Total Events (Count),9"));
    assert!(text.contains("Phase 1 Avg (s),"));
}

#[test]
fn test_analyze_section_from_env_plan() {
    let dir = recording();
    let plan = write_plan(dir.path(), UP_DOWN_PLAN);
    let output = cadence()
        .env("CADENCE_PLAN", &plan)
        .args(["analyze", "--quiet", "--compact", "--section", "2,12"])
        .args(["--dir", dir.path().to_str().unwrap()])
        .assert()
        .success();

    let parsed = stdout_json(output.get_output());
    let sections = parsed["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0]["name"], "Section 1");
    assert_eq!(sections[0]["summary"]["descent_m"], 10.0);
    assert!(parsed["active_section"]["section"].is_string());
    assert_eq!(parsed["session_duration"], 10.0);
    assert_eq!(parsed["analysis"]["statistics"]["count"], 4);
}

#[test]
fn test_analyze_unknown_event_is_analysis_error() {
    let dir = recording();
    let plan = write_plan(
        dir.path(),
        r#"{ "detections": [ { "name": "up", "channel": "acc_y" } ],
             "cycles": { "start": "up", "end": "missing" } }"#,
    );
    cadence()
        .args(["analyze", "--quiet", "--plan", &plan])
        .args(["--dir", dir.path().to_str().unwrap()])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Analysis failed"));
}

#[test]
fn test_analyze_invalid_plan() {
    let dir = recording();
    let plan = write_plan(dir.path(), "{ \"detections\": 5 }");
    cadence()
        .args(["analyze", "--plan", &plan])
        .args(["--dir", dir.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid plan"));
}

#[test]
fn test_analyze_output_file() {
    let dir = recording();
    let out = dir.path().join("result.json");
    cadence()
        .args(["analyze", "--dir", dir.path().to_str().unwrap()])
        .args(["-o", out.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("Results written to"));
    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(parsed["recording"]["gps_samples"], 21);
}
