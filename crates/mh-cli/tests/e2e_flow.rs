//! End-to-end tests driving the `mh` binary.
//!
//! Each test gets its own database through a `--config` file and runs in UTC
//! so report windows do not depend on the host timezone.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::{Datelike, Utc};
use tempfile::TempDir;

fn mh_binary() -> String {
    env!("CARGO_BIN_EXE_mh").to_string()
}

/// Writes a config file pointing at a fresh database in `temp`.
fn write_config(temp: &Path) -> PathBuf {
    let db_path = temp.join("data").join("myhours.db");
    let config_path = temp.join("config.toml");
    std::fs::write(
        &config_path,
        format!("database_path = {:?}\n", db_path.display().to_string()),
    )
    .unwrap();
    config_path
}

fn mh(config: &Path, args: &[&str]) -> Output {
    Command::new(mh_binary())
        .env("TZ", "UTC")
        .env("HOME", config.parent().unwrap())
        .env_remove("MH_DATABASE_PATH")
        .env_remove("MH_DEFAULT_REPORT")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("failed to run mh")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "mh should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn page_of_year(year: i32) -> String {
    (year - Utc::now().year()).to_string()
}

const RECORDS_2020: &str = "\
# year-end push
2020-12-28T09:00:00Z,2h,1,planning
2020-12-29T09:00:00Z,1h30m,1,
2020-12-29T13:00:00Z,30m,1,review
2020-03-02T08:00:00Z,45m,1,
";

/// Import, then look at the imported year through each report kind.
#[test]
fn test_import_then_report() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    let file = temp.path().join("records.csv");
    std::fs::write(&file, RECORDS_2020).unwrap();

    let output = mh(&config, &["import", file.to_str().unwrap()]);
    assert_eq!(stdout(&output), "Imported 4 records\n");

    let page = page_of_year(2020);
    let output = mh(&config, &["report", "year", "--page", &page]);
    let report = stdout(&output);
    insta::assert_snapshot!(report.trim_end(), @r"
    Year 2020
    Category: Work

    Month      Active days  Duration
    ─────────  ───────────  ────────
    January    0            0s
    February   0            0s
    March      1            45m0s
    April      0            0s
    May        0            0s
    June       0            0s
    July       0            0s
    August     0            0s
    September  0            0s
    October    0            0s
    November   0            0s
    December   2            4h0m0s
    ─────────  ───────────  ────────
    Total      3            4h45m0s
    ");

    let output = mh(&config, &["report", "year", "--page", &page, "--json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["kind"], "yearly");
    assert_eq!(json["title"], "Year 2020");
    assert_eq!(json["from"], "2020-01-01T00:00:00Z");
    assert_eq!(json["before"], "2021-01-01T00:00:00Z");
    assert_eq!(json["rows"][11]["cells"][2], "4h0m0s");
    assert_eq!(json["rows"][12]["style"], "total");
}

#[test]
fn test_empty_year_reports_no_data() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let page = page_of_year(2019);
    let output = mh(&config, &["report", "year", "--page", &page, "--all", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();

    assert_eq!(json["category"], serde_json::Value::Null);
    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["style"], "normal");
    assert_eq!(rows[0]["cells"][0], "NO DATA");
}

#[test]
fn test_start_twice_fails() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let output = mh(&config, &["start", "--notes", "deep work"]);
    assert!(stdout(&output).starts_with("Started record 1 (Work)"));

    let output = mh(&config, &["start"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already active"), "stderr: {stderr}");

    let output = mh(&config, &["status"]);
    let status = stdout(&output);
    assert!(status.contains("Active: record 1 (Work)"));
    assert!(status.contains("Notes: deep work"));

    let output = mh(&config, &["stop"]);
    assert!(stdout(&output).starts_with("Stopped record 1 after "));
}

#[test]
fn test_bad_import_line_aborts_whole_file() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    let file = temp.path().join("records.csv");
    std::fs::write(
        &file,
        "2020-12-28T09:00:00Z,2h,1,\n2020-12-29T09:00:00Z,two hours,1,\n",
    )
    .unwrap();

    let output = mh(&config, &["import", file.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2"), "stderr: {stderr}");

    let page = page_of_year(2020);
    let output = mh(&config, &["report", "year", "--page", &page, "--json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["rows"][0]["cells"][0], "NO DATA");
}

#[test]
fn test_categories_and_default_category() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let output = mh(&config, &["categories", "add", "Study"]);
    assert_eq!(stdout(&output), "Added category 2: Study\n");

    let output = mh(&config, &["settings", "default-category", "2"]);
    assert_eq!(stdout(&output), "Default category is now 2 (Study)\n");

    let output = mh(&config, &["categories", "list"]);
    assert_eq!(stdout(&output), "   1  Work\n   2  Study (default)\n");

    let output = mh(&config, &["settings", "default-category", "7"]);
    assert!(!output.status.success());
}
