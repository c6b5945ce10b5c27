use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Minimal valid config with loop timings shrunk so sim runs finish quickly
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[scan]
backlash_steps = 130
coarse_step = 100
fine_step = 50

[driver]
tick_ms = 1
peer_wait_ms = 1
settle_timeout_ms = 5
move_retry_ms = 1
arrival_poll_ms = 1

[device]
# unused by the simulated link
remote_host = "10.0.0.2"
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--sim", "--ticks", "5"], 0, "alignment stopped", "stdout")]
#[case(&["self-check", "--sim"], 0, "self-check ok", "stdout")]
#[case(&["run", "--sim", "--ticks"], 2, "value is required", "stderr")]
#[case(&["scan-report"], 2, "required", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("align").unwrap();
    // Always include a valid config to avoid relying on default path
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
#[case("[scan]\nfine_step = 0\n", "scan.fine_step must be > 0")]
#[case("[peer]\nbusy_min = 5\nbusy_max = 1\n", "peer.busy_min")]
#[case("[scan\n", "parse")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation")]
fn invalid_config_exits_with_config_code(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, toml).unwrap();

    Command::cargo_bin("align")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["self-check", "--sim"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("What happened: Configuration is invalid"))
        .stderr(predicate::str::contains(needle));
}

#[rstest]
fn missing_config_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("align")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .args(["run", "--sim"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("nope.toml"));
}

#[rstest]
fn real_units_need_the_hardware_backend_or_a_host() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[driver]\ntick_ms = 1\n").unwrap();
    // Without the `hardware` feature the backend is missing; with it, the
    // config has no remote_host. Either way nothing is contacted.
    Command::cargo_bin("align")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--ticks", "1"])
        .assert()
        .code(3);
}

#[rstest]
fn unreachable_peer_bubbles_to_cli() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    Command::cargo_bin("align")
        .unwrap()
        .env("ALIGN_TEST_SIM_OFFLINE", "1")
        .arg("--config")
        .arg(&cfg)
        .args(["self-check", "--sim"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains(
            "What happened: A unit did not answer in time",
        ));
}

#[rstest]
fn busy_peer_holds_the_run_in_await_idle() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    Command::cargo_bin("align")
        .unwrap()
        .env("ALIGN_TEST_SIM_PEER_STATE", "2")
        .arg("--config")
        .arg(&cfg)
        .args(["--log-level", "error", "run", "--sim", "--ticks", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("state=await_peer_idle"))
        .stdout(predicate::str::contains("samples=0"));
}

#[rstest]
fn scan_report_summarises_a_record() {
    let dir = tempdir().unwrap();
    let record = dir.path().join("scan.txt");
    fs::write(
        &record,
        "0 130 130 -12.500000 -12.000000\n1 80 80 -11.000000 -9.250000\n2 80 130 -10.000000 -9.500000\n",
    )
    .unwrap();

    Command::cargo_bin("align")
        .unwrap()
        .arg("scan-report")
        .arg(&record)
        .assert()
        .success()
        .stdout(predicate::str::contains("samples: 3"))
        .stdout(predicate::str::contains("best: index 1 at (80, 80) remote -9.25 dBm"));
}

#[rstest]
fn scan_report_on_missing_file_fails() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("align")
        .unwrap()
        .arg("scan-report")
        .arg(dir.path().join("missing.txt"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not read the scan record"));
}
