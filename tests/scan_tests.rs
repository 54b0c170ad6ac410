// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Dataset reconstruction tests.
//!
//! The recorder-scanner fixtures run under lenient naming with orphan
//! promotion; the remaining cases use the strict defaults.

mod common;

use std::path::{Path, PathBuf};

use bagstitch::scan::{
    reconstruct, scan_dir, NamingConvention, OrphanPolicy, ScanOptions, ScanReport,
};

use common::{temp_dir, touch_all};

fn recorder() -> ScanOptions {
    ScanOptions {
        naming: NamingConvention::Lenient,
        orphans: OrphanPolicy::Promote,
    }
}

fn scan(names: &[&str], options: &ScanOptions) -> ScanReport {
    reconstruct(Path::new("/"), names, options)
}

fn ds(name: &str, files: &[&str]) -> (String, Vec<PathBuf>) {
    (
        name.to_string(),
        files.iter().map(|f| Path::new("/").join(f)).collect(),
    )
}

fn datasets(report: &ScanReport) -> Vec<(String, Vec<PathBuf>)> {
    report
        .datasets
        .iter()
        .map(|d| (d.name.clone(), d.files.clone()))
        .collect()
}

#[test]
fn test_nonbag() {
    for options in [ScanOptions::default(), recorder()] {
        let report = scan(&["a", "b"], &options);
        assert!(report.datasets.is_empty());
        assert!(report.orphans.is_empty());
    }
}

#[test]
fn test_single_bags() {
    let report = scan(&["foo.bag", "bar.bag"], &recorder());
    assert_eq!(
        datasets(&report),
        vec![ds("foo", &["foo.bag"]), ds("bar", &["bar.bag"])]
    );
}

#[test]
fn test_rosbag_sets() {
    let names = [
        "set0_0000-00-00-00-00-00_0.bag",
        "set0_0000-01-00-00-00-00_1.bag",
        "set0_0000-02-00-00-00-00_2.bag",
        "set1_0000-00-00-00-00-00_0.bag",
        "set1_0000-01-00-00-00-00_1.bag",
        "set1_0000-02-00-00-00-00_2.bag",
        "set2.bag",
        "set2_0000-00-00-00-00-00_0.bag",
        "set2_0000-00-00-00-00-00_1.bag",
        "set2_0000-00-00-00-00-00_2.bag",
    ];
    let expected = vec![
        ds("set0", &names[0..3]),
        ds("set1", &names[3..6]),
        ds("set2", &names[6..7]),
        ds("set2", &names[7..10]),
    ];

    // Identical under both conventions, nothing orphaned
    for options in [ScanOptions::default(), recorder()] {
        let report = scan(&names, &options);
        assert_eq!(datasets(&report), expected);
        assert!(report.orphans.is_empty());
    }
}

#[test]
fn test_scan_broken_set_edge_cases() {
    let names = [
        "set0_0000-00-00-00-00-00_0.bag",
        "set0_0000-00-00-00-00-00_2.bag",
        "set1_0000-00-00-00-00-00_1.bag",
        "set1_0000-00-00-00-00-00_2.bag",
        "set2.bag",
        "set2_0000-00-00-00-00-00_1.bag",
        "set2_0000-00-00-00-00-00_2.bag",
    ];
    let report = scan(&names, &recorder());
    assert_eq!(
        datasets(&report),
        vec![
            ds("set0", &["set0_0000-00-00-00-00-00_0.bag"]),
            ds("set0_0000-00-00-00-00-00_2", &["set0_0000-00-00-00-00-00_2.bag"]),
            ds("set1_0000-00-00-00-00-00_1", &["set1_0000-00-00-00-00-00_1.bag"]),
            ds("set1_0000-00-00-00-00-00_2", &["set1_0000-00-00-00-00-00_2.bag"]),
            ds("set2", &["set2.bag"]),
            ds("set2_0000-00-00-00-00-00_1", &["set2_0000-00-00-00-00-00_1.bag"]),
            ds("set2_0000-00-00-00-00-00_2", &["set2_0000-00-00-00-00-00_2.bag"]),
        ]
    );
    assert!(report.orphans.is_empty());
}

#[test]
fn test_broken_sets_report_orphans_by_default() {
    let names = [
        "set0_0000-00-00-00-00-00_0.bag",
        "set0_0000-00-00-00-00-00_2.bag",
        "set1_0000-00-00-00-00-00_1.bag",
        "set1_0000-00-00-00-00-00_2.bag",
        "set2.bag",
        "set2_0000-00-00-00-00-00_1.bag",
        "set2_0000-00-00-00-00-00_2.bag",
    ];
    let report = scan(&names, &ScanOptions::default());
    assert_eq!(
        datasets(&report),
        vec![
            ds("set0", &["set0_0000-00-00-00-00-00_0.bag"]),
            ds("set2", &["set2.bag"]),
        ]
    );
    let orphans: Vec<PathBuf> = [1, 2, 3, 5, 6]
        .iter()
        .map(|&i| Path::new("/").join(names[i]))
        .collect();
    assert_eq!(report.orphans, orphans);
}

#[test]
fn test_without_timestamp() {
    let report = scan(
        &["foo_0.bag", "foo_1.bag", "foo_3.bag", "foo_4.bag"],
        &recorder(),
    );
    assert_eq!(
        datasets(&report),
        vec![
            ds("foo", &["foo_0.bag", "foo_1.bag"]),
            ds("foo_3", &["foo_3.bag"]),
            ds("foo_4", &["foo_4.bag"]),
        ]
    );
}

#[test]
fn test_without_timestamp_strict_keeps_files_apart() {
    let report = scan(&["foo_0.bag", "foo_1.bag"], &ScanOptions::default());
    assert_eq!(
        datasets(&report),
        vec![ds("foo_0", &["foo_0.bag"]), ds("foo_1", &["foo_1.bag"])]
    );
}

#[test]
fn test_mixed_edge_cases() {
    let report = scan(
        &[
            "set0_0000-00-00-00-00-00_0.bag",
            "set0_1.bag",
            "set0_1000-00-00-00-00-00_2.bag",
        ],
        &recorder(),
    );
    assert_eq!(
        datasets(&report),
        vec![
            ds("set0", &["set0_0000-00-00-00-00-00_0.bag"]),
            ds("set0_1", &["set0_1.bag"]),
            ds("set0_1000-00-00-00-00-00_2", &["set0_1000-00-00-00-00-00_2.bag"]),
        ]
    );
}

#[test]
fn test_missing_index() {
    let names = ["foo_0000-11-00-00-00-00.bag", "foo_0000-22-00-00-00-00.bag"];
    for options in [ScanOptions::default(), recorder()] {
        let report = scan(&names, &options);
        assert_eq!(
            datasets(&report),
            vec![
                ds("foo_0000-11-00-00-00-00", &[names[0]]),
                ds("foo_0000-22-00-00-00-00", &[names[1]]),
            ]
        );
    }
}

#[test]
fn test_gap_before_zero_strict() {
    let names = [
        "set_2021-05-05-10-00-00_0.bag",
        "set_2021-05-05-10-10-00_2.bag",
    ];
    let report = scan(&names, &ScanOptions::default());
    assert_eq!(datasets(&report), vec![ds("set", &names[..1])]);
    assert_eq!(report.orphans, vec![Path::new("/").join(names[1])]);
}

#[test]
fn test_scan_dir_lists_and_sorts() {
    let (dir, _guard) = temp_dir("scan_dir");
    touch_all(
        &dir,
        &[
            "run_2022-02-02-02-02-02_1.bag",
            "notes.txt",
            "run_2022-02-02-02-00-00_0.bag",
            "solo.bag",
            "run_2022-02-02-02-04-00_2.bag.active",
        ],
    );
    std::fs::create_dir(dir.join("nested.bag")).unwrap();

    let report = scan_dir(&dir, &ScanOptions::default()).unwrap();
    let names: Vec<&str> = report.datasets.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["run", "solo"]);
    assert_eq!(
        report.datasets[0].files,
        vec![
            dir.join("run_2022-02-02-02-00-00_0.bag"),
            dir.join("run_2022-02-02-02-02-02_1.bag"),
        ]
    );
    assert!(report.orphans.is_empty());
}

#[test]
fn test_scan_report_serializes() {
    let report = scan(&["a.bag"], &ScanOptions::default());
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["datasets"][0]["name"], "a");
    assert_eq!(json["datasets"][0]["files"][0], "/a.bag");
    assert!(json["orphans"].as_array().unwrap().is_empty());
}
