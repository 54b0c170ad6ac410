// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CLI integration tests.
//!
//! These tests run the actual bagstitch binary and verify its behavior.

mod common;

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use common::{conn, msg, series, temp_dir, touch_all, write_bag};

const T0: u64 = 1_650_000_000_000_000_000;

/// Run bagstitch with arguments
fn run(args: &[&str]) -> Output {
    let bin = env!("CARGO_BIN_EXE_bagstitch");
    Command::new(bin)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|_| panic!("Failed to run {bin}"))
}

/// Run bagstitch and assert success
fn run_ok(args: &[&str]) -> String {
    let output = run(args);
    assert!(
        output.status.success(),
        "Command failed: {:?}\nstdout: {}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn path_arg(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

/// Two-file dataset with `/imu` and `/odom`.
fn fixture(dir: &Path) -> (PathBuf, PathBuf) {
    let connections = [conn("/imu", "sensor_msgs/Imu"), conn("/odom", "nav_msgs/Odometry")];
    let f0 = write_bag(
        &dir.join("run_2022-04-15-10-00-00_0.bag"),
        &connections,
        &[msg(0, T0, 0), msg(1, T0 + 2, 0)],
    );
    let f1 = write_bag(
        &dir.join("run_2022-04-15-10-05-00_1.bag"),
        &connections,
        &[msg(0, T0 + 1, 1), msg(1, T0 + 3, 1)],
    );
    (f0, f1)
}

#[test]
fn test_cli_help() {
    let output = run_ok(&["--help"]);
    assert!(output.contains("scan"));
    assert!(output.contains("meta"));
    assert!(output.contains("replay"));
}

#[test]
fn test_cli_scan_text() {
    let (dir, _guard) = temp_dir("cli_scan");
    touch_all(
        &dir,
        &[
            "a_2020-01-01-00-00-00_0.bag",
            "a_2020-01-01-00-00-00_1.bag",
            "b_2020-01-01-00-00-00_3.bag",
        ],
    );

    let out = run_ok(&["scan", &path_arg(&dir)]);
    assert!(out.contains("Datasets: 1"));
    assert!(out.contains("a (2 files)"));
    assert!(out.contains("Orphans: 1"));
    assert!(out.contains("b_2020-01-01-00-00-00_3.bag"));
}

#[test]
fn test_cli_scan_json_promote() {
    let (dir, _guard) = temp_dir("cli_scan_json");
    touch_all(&dir, &["foo_0.bag", "foo_1.bag", "foo_3.bag"]);

    let out = run_ok(&["scan", &path_arg(&dir), "--lenient", "--promote-orphans", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    let names: Vec<&str> = json["datasets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["foo", "foo_3"]);
    assert!(json["orphans"].as_array().unwrap().is_empty());
}

#[test]
fn test_cli_scan_config_file() {
    let (dir, _guard) = temp_dir("cli_scan_config");
    touch_all(&dir, &["foo_0.bag", "foo_1.bag"]);
    let config = dir.join("bagstitch.toml");
    std::fs::write(&config, "[scan]\nnaming = \"lenient\"\n").unwrap();

    let out = run_ok(&[
        "--config",
        &path_arg(&config),
        "scan",
        &path_arg(&dir),
        "--json",
    ]);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["datasets"].as_array().unwrap().len(), 1);
    assert_eq!(json["datasets"][0]["name"], "foo");
}

#[test]
fn test_cli_meta_json() {
    let (dir, _guard) = temp_dir("cli_meta");
    let (f0, f1) = fixture(&dir);

    let out = run_ok(&["meta", &path_arg(&f0), &path_arg(&f1)]);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["name"], "run");
    assert_eq!(json["message_count"], 4);
    assert_eq!(json["topics"]["/imu"]["message_count"], 2);
    assert_eq!(json["files"].as_array().unwrap().len(), 2);
}

#[test]
fn test_cli_meta_summary() {
    let (dir, _guard) = temp_dir("cli_meta_summary");
    let (f0, f1) = fixture(&dir);

    let out = run_ok(&["meta", "--summary", "--name", "drive", &path_arg(&f0), &path_arg(&f1)]);
    assert!(out.contains("=== drive ==="));
    assert!(out.contains("Messages: 4"));
    assert!(out.contains("/odom | nav_msgs/Odometry | 2 messages"));
}

#[test]
fn test_cli_meta_integrity_fault_exit_code() {
    let (dir, _guard) = temp_dir("cli_meta_fault");
    let f0 = write_bag(&dir.join("x_0.bag"), &[conn("/a", "T")], &series(&[T0], 0));
    let f1 = write_bag(&dir.join("x_1.bag"), &[conn("/a", "U")], &series(&[T0 + 1], 1));

    let output = run(&["meta", &path_arg(&f0), &path_arg(&f1)]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("topic '/a' changed message_type"));
}

#[test]
fn test_cli_replay_order() {
    let (dir, _guard) = temp_dir("cli_replay");
    let (f0, f1) = fixture(&dir);

    let out = run_ok(&["replay", &path_arg(&f0), &path_arg(&f1), "-s", "*:*"]);
    let topics: Vec<&str> = out
        .lines()
        .filter(|l| l.ends_with("bytes"))
        .map(|l| l.split_whitespace().nth(4).unwrap())
        .collect();
    assert_eq!(topics, vec!["/imu", "/imu", "/odom", "/odom"]);
    assert!(out.contains("close #0 /imu: 2 messages"));
    assert!(out.contains("close #1 /odom: 2 messages"));
}

#[test]
fn test_cli_replay_unmatched_subscription() {
    let (dir, _guard) = temp_dir("cli_replay_none");
    let (f0, _) = fixture(&dir);

    let out = run_ok(&["replay", &path_arg(&f0), "-s", "/missing"]);
    assert!(out.contains("/missing: no matching topic"));
}

#[test]
fn test_cli_replay_invalid_subscription() {
    let (dir, _guard) = temp_dir("cli_replay_invalid");
    let (f0, _) = fixture(&dir);

    let output = run(&["replay", &path_arg(&f0), "-s", "a:b:c"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid subscription"));
}
