//! End-to-end tests driving the ticketstats binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const EXPORT: &str = "\
Issue key;Issue id;Summary;Issue Type;Status;Priority;Created;Component/s;Outward issue link (Issue split)
CORE-1;10001;Login feature;New Feature;Open;Major;04/Mar/24 3:15 PM;backend;CORE-2
CORE-2;10002;Login backend;New Feature;Open;Major;05/Mar/24 1:00 PM;backend;
CORE-3;10003;Crash on save;Bug;Open;Critical;01/Feb/24 9:10 AM;ui;
";

fn write_export(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("export.csv");
    fs::write(&path, content).unwrap();
    path
}

fn ticketstats() -> Command {
    Command::cargo_bin("ticketstats").unwrap()
}

#[test]
fn report_writes_html_file() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path(), EXPORT);

    ticketstats()
        .args(["report", export.to_str().unwrap(), "--output-dir"])
        .arg(dir.path())
        .assert()
        .success();

    let html = fs::read_to_string(dir.path().join("report.html")).unwrap();
    assert!(html.contains("Ticket Report"));
    assert!(html.contains("CORE-3"));
    assert!(html.contains("Crash on save"));
    // the feature cluster root carries its split child
    assert!(html.contains("Login feature"));
    assert!(html.contains("Login backend"));
}

#[test]
fn report_splits_by_component() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path(), EXPORT);

    ticketstats()
        .args([
            "report",
            export.to_str().unwrap(),
            "--split-by-component",
            "--output-dir",
        ])
        .arg(dir.path())
        .assert()
        .success();

    assert!(dir.path().join("report.html").exists());
    assert!(dir.path().join("report_backend.html").exists());
    assert!(dir.path().join("report_ui.html").exists());

    let backend = fs::read_to_string(dir.path().join("report_backend.html")).unwrap();
    assert!(backend.contains("Ticket Report backend"));
    assert!(!backend.contains("Crash on save"));
}

#[test]
fn report_with_component_filter_disables_split() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path(), EXPORT);

    ticketstats()
        .args([
            "report",
            export.to_str().unwrap(),
            "--component",
            "ui",
            "--split-by-component",
            "--output-dir",
        ])
        .arg(dir.path())
        .assert()
        .success();

    assert!(dir.path().join("report_ui.html").exists());
    assert!(!dir.path().join("report_backend.html").exists());
}

#[test]
fn report_links_tickets_to_tracker() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path(), EXPORT);

    ticketstats()
        .args([
            "report",
            export.to_str().unwrap(),
            "--tracker-url",
            "https://tracker.example.com/browse/",
            "--output-dir",
        ])
        .arg(dir.path())
        .assert()
        .success();

    let html = fs::read_to_string(dir.path().join("report.html")).unwrap();
    assert!(html.contains("https://tracker.example.com/browse/CORE-3"));
}

#[test]
fn clusters_prints_forest() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path(), EXPORT);

    ticketstats()
        .args(["clusters", export.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("CORE-1 Login feature New Feature"))
        .stdout(predicate::str::contains(
            "|- CORE-2 Login backend New Feature",
        ));
}

#[test]
fn project_filter_narrows_forest() {
    let dir = TempDir::new().unwrap();
    let mixed = "\
Issue key;Issue id;Summary;Issue Type;Outward issue link (Issue split)
CORE-1;10001;Core work;Task;CORE-2
CORE-2;10002;Core detail;Task;
UI-1;20001;Ui work;Task;UI-2
UI-2;20002;Ui detail;Task;
";
    let export = write_export(dir.path(), mixed);

    ticketstats()
        .args(["clusters", export.to_str().unwrap(), "--project", "UI"])
        .assert()
        .success()
        .stdout(predicate::str::contains("UI-1 Ui work Task"))
        .stdout(predicate::str::contains("CORE-1").not());
}

#[test]
fn missing_export_exits_with_not_found() {
    let dir = TempDir::new().unwrap();

    ticketstats()
        .args(["report", "does-not-exist.csv", "--output-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("unable to read ticket export"));
}

#[test]
fn cyclic_links_exit_with_validation_failure() {
    let dir = TempDir::new().unwrap();
    let cyclic = "\
Issue key;Issue id;Summary;Issue Type;Outward issue link (parent)
CORE-1;10001;First;Task;CORE-2
CORE-2;10002;Second;Task;CORE-1
";
    let export = write_export(dir.path(), cyclic);

    ticketstats()
        .args(["report", export.to_str().unwrap(), "--output-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("cycle detected"));
}

#[test]
fn quiet_suppresses_informational_logs() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path(), EXPORT);

    ticketstats()
        .args(["clusters", export.to_str().unwrap(), "--quiet"])
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed").not());
}

#[test]
fn config_file_flips_part_link_direction() {
    let dir = TempDir::new().unwrap();
    let export = write_export(
        dir.path(),
        "\
Issue key;Issue id;Summary;Issue Type;Outward issue link (Part)
CORE-1;10001;Whole;Task;CORE-2
CORE-2;10002;Piece;Task;
",
    );
    let config = dir.path().join("ticketstats.toml");
    fs::write(
        &config,
        "[links]\npart_direction = \"referenced-is-child\"\n",
    )
    .unwrap();

    // default policy: the referenced part CORE-2 is the parent
    ticketstats()
        .args(["clusters", export.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("CORE-2 Piece Task\n|- CORE-1 Whole Task"));

    // flipped policy: CORE-1 keeps its part as a child
    ticketstats()
        .args(["clusters", export.to_str().unwrap(), "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("CORE-1 Whole Task\n|- CORE-2 Piece Task"));
}

#[test]
fn invalid_config_value_is_rejected() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path(), EXPORT);
    let config = dir.path().join("ticketstats.toml");
    fs::write(&config, "[links]\npart_direction = \"sideways\"\n").unwrap();

    ticketstats()
        .args(["clusters", export.to_str().unwrap(), "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid part link direction"));
}
