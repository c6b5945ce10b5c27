use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[driver]
tick_ms = 1
peer_wait_ms = 1
settle_timeout_ms = 5
move_retry_ms = 1
arrival_poll_ms = 1
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn last_json_line(stdout: &[u8]) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(stdout);
    let line = stdout
        .lines()
        .rev()
        .find(|l| l.trim_start().starts_with('{'))
        .unwrap_or("");
    assert!(!line.is_empty(), "no JSON line on stdout: {stdout}");
    serde_json::from_str(line).expect("valid JSON")
}

/// Validate the JSON summary of a sim run and the record it leaves behind.
#[rstest]
fn run_summary_schema_and_record() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let record = dir.path().join("scan.txt");

    let out = Command::cargo_bin("align")
        .unwrap()
        .args(["--json", "--log-level", "error", "--config"])
        .arg(&cfg)
        .args(["run", "--sim", "--ticks", "400", "--record"])
        .arg(&record)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = last_json_line(&out);

    for key in ["ticks", "steps", "moves", "samples", "stale_skips"] {
        assert!(v[key].is_u64(), "{key} missing or not an integer: {v}");
    }
    assert_eq!(v["ticks"], 400);
    assert!(v["final_state"].is_string());
    assert!(v["final_position"]["x"].is_i64());

    let samples = v["samples"].as_u64().unwrap();
    assert!(samples >= 9, "samples {samples}");
    let text = fs::read_to_string(&record).unwrap();
    assert_eq!(text.lines().count() as u64, samples);

    // the record round-trips through scan-report
    let out = Command::cargo_bin("align")
        .unwrap()
        .args(["--json", "scan-report"])
        .arg(&record)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report = last_json_line(&out);
    assert_eq!(report["samples"].as_u64(), Some(samples));
    assert!(report["best"]["remote_dbm"].is_f64());
}

/// Validate the JSON error schema for a device failure.
#[rstest]
fn error_schema_for_unreachable_peer() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("align")
        .unwrap()
        .env("ALIGN_TEST_SIM_OFFLINE", "1")
        .args(["--json", "--log-level", "error", "--config"])
        .arg(&cfg)
        .args(["self-check", "--sim"])
        .assert()
        .code(4)
        .get_output()
        .stdout
        .clone();
    let v = last_json_line(&out);
    assert_eq!(v["reason"], "Timeout");
    assert_eq!(v["exit_code"], 4);
    assert!(v["message"].as_str().unwrap().starts_with("What happened:"));
}

#[rstest]
fn self_check_json_reports_both_units() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let out = Command::cargo_bin("align")
        .unwrap()
        .args(["--json", "--log-level", "error", "--config"])
        .arg(&cfg)
        .args(["self-check", "--sim"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = last_json_line(&out);
    assert_eq!(v["ok"], true);
    assert_eq!(v["peer"]["state"], 5);
    assert_eq!(v["local"]["x"], 0);
    assert!(v["local"]["rx_dbm"].is_f64());
}
