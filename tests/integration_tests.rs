//! Integration tests for the cmma CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HEADER: &str = "No,測量專案,實測值,設計值,上限公差,下限公差,單位,判斷";

/// Helper to get a cmma command isolated from user and project config
fn cmma(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cmma").unwrap();
    cmd.current_dir(tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join("xdg"))
        .env("HOME", tmp.path())
        .env_remove("CMMA_TARGET_YIELD")
        .env_remove("CMMA_LOG_FILE")
        .env_remove("RUST_LOG");
    cmd
}

/// Text of an instrument export with a preamble, a timestamp and `rows`
fn report_text(rows: &[&str]) -> String {
    let mut text = String::from("Part,Bracket\n測量日期及時間,2024/05/02 下午 01:30:00\n");
    text.push_str(HEADER);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}

/// Write a UTF-8 report into `dir`
fn write_report(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, report_text(rows)).unwrap();
    path
}

/// Two reports of one length item; b.csv is out of tolerance
fn setup_length_reports() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("reports");
    fs::create_dir_all(&dir).unwrap();
    write_report(&dir, "a.csv", &["1,Length,10.05,10,0.1,-0.1,mm,OK"]);
    write_report(&dir, "b.csv", &["1,Length,10.2,10,0.1,-0.1,mm,NG"]);
    tmp
}

/// Two reports with a coordinate pair
fn setup_pair_reports() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("reports");
    fs::create_dir_all(&dir).unwrap();
    write_report(
        &dir,
        "a.csv",
        &[
            "7,Pos_7[X座標],10.03,10,0.05,-0.05,mm,OK",
            "8,Pos_7[Y座標],20.04,20,0.05,-0.05,mm,OK",
        ],
    );
    write_report(
        &dir,
        "b.csv",
        &[
            "7,Pos_7[X座標],10.06,10,0.05,-0.05,mm,NG",
            "8,Pos_7[Y座標],20.06,20,0.05,-0.05,mm,NG",
        ],
    );
    tmp
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    cmma(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("records"))
        .stdout(predicate::str::contains("stats"))
        .stdout(predicate::str::contains("tolerance"));
}

#[test]
fn test_version_displays() {
    let tmp = TempDir::new().unwrap();
    cmma(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cmma"));
}

#[test]
fn test_missing_paths_is_usage_error() {
    let tmp = TempDir::new().unwrap();
    cmma(&tmp).arg("stats").assert().failure();
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    cmma(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cmma"));
}

// ============================================================================
// Records Tests
// ============================================================================

#[test]
fn test_records_lists_judgements() {
    let tmp = setup_length_reports();
    cmma(&tmp)
        .args(["records", "reports", "-f", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "a.csv,2024-05-02 13:30:00,1,Length,10.0500,10.0000,0.1000,-0.1000,0.0500,mm,OK,OK",
        ))
        .stdout(predicate::str::contains("b.csv"))
        .stdout(predicate::str::contains("FAIL"));
}

#[test]
fn test_records_only_fail() {
    let tmp = setup_length_reports();
    cmma(&tmp)
        .args(["records", "reports", "--only-fail", "-f", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("b.csv"))
        .stdout(predicate::str::contains("a.csv").not());
}

#[test]
fn test_records_json() {
    let tmp = setup_length_reports();
    let output = cmma(&tmp)
        .args(["records", "reports", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let items = value.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1]["judgement"], "fail");
    assert_eq!(items[0]["source"], "a.csv");
}

#[test]
fn test_records_export_has_bom() {
    let tmp = setup_length_reports();
    cmma(&tmp)
        .args(["records", "reports", "-o", "out.csv"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Wrote 2 record(s)"));

    let bytes = fs::read(tmp.path().join("out.csv")).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
    assert!(text.starts_with("Source,Captured,No,Label"));
    assert_eq!(text.lines().count(), 3);
}

#[test]
fn test_records_big5_report() {
    let tmp = TempDir::new().unwrap();
    let text = report_text(&["3,孔徑,5.01,5,0.02,-0.02,mm,OK"]);
    let (bytes, _, had_errors) = encoding_rs::BIG5.encode(&text);
    assert!(!had_errors);
    fs::write(tmp.path().join("big5.csv"), &bytes).unwrap();

    cmma(&tmp)
        .args(["records", "big5.csv", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("孔徑"))
        .stdout(predicate::str::contains("2024-05-02 13:30:00"));
}

#[test]
fn test_duplicate_stem_prefers_csv() {
    let tmp = setup_length_reports();
    fs::write(tmp.path().join("reports").join("a.pdf"), b"not a pdf").unwrap();

    cmma(&tmp)
        .args(["records", "reports", "-f", "csv"])
        .assert()
        .success()
        .stderr(predicate::str::contains("a.pdf").not());
}

#[test]
fn test_broken_document_is_skipped() {
    let tmp = setup_length_reports();
    fs::write(tmp.path().join("reports").join("c.pdf"), b"not a pdf").unwrap();

    cmma(&tmp)
        .args(["records", "reports", "-f", "csv"])
        .assert()
        .success()
        .stderr(predicate::str::contains("skipped c.pdf"))
        .stdout(predicate::str::contains("b.csv"));
}

// ============================================================================
// Error Tests
// ============================================================================

#[test]
fn test_no_data_extracted() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("junk.csv"), "just,some,text\n1,2,3\n").unwrap();

    cmma(&tmp)
        .args(["stats", "junk.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No data extracted from 1 file(s)"));
}

#[test]
fn test_empty_directory() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("empty")).unwrap();

    cmma(&tmp)
        .args(["stats", "empty"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No CSV or PDF reports found"));
}

#[test]
fn test_missing_input_path() {
    let tmp = TempDir::new().unwrap();
    cmma(&tmp)
        .args(["records", "nope.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("skipped nope.csv"))
        .stderr(predicate::str::contains("No data extracted from 1 file(s)"));
}

#[test]
fn test_missing_input_does_not_stop_batch() {
    let tmp = setup_length_reports();
    cmma(&tmp)
        .args(["records", "nope.csv", "reports", "-f", "csv"])
        .assert()
        .success()
        .stderr(predicate::str::contains("skipped nope.csv"))
        .stdout(predicate::str::contains("a.csv"))
        .stdout(predicate::str::contains("b.csv"));
}

#[test]
fn test_invalid_yield_rejected() {
    let tmp = setup_length_reports();
    cmma(&tmp)
        .args(["stats", "reports", "--yield", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("yield must lie between 0 and 1"));
}

// ============================================================================
// Stats Tests
// ============================================================================

#[test]
fn test_stats_csv_snapshot() {
    let tmp = setup_length_reports();
    let output = cmma(&tmp)
        .args(["stats", "reports", "-f", "csv"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();

    insta::assert_snapshot!(stdout.trim_end(), @r###"
    no,label,kind,count,fail_count,fail_rate,cpk,mean,max,min,design,upper,lower,suggested,tier,comparison
    1,Length,1D,2,1,50.0%,-0.08,10.1250,10.2000,10.0500,10.0000,0.1000,-0.1000,0.2995,small_sample,spec tight
    "###);
}

#[test]
fn test_stats_summary() {
    let tmp = setup_length_reports();
    cmma(&tmp)
        .args(["stats", "reports"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary"))
        .stdout(predicate::str::contains("Items with NG"))
        .stdout(predicate::str::contains("50.0%"));
}

#[test]
fn test_stats_merges_coordinate_pairs() {
    let tmp = setup_pair_reports();
    let output = cmma(&tmp)
        .args(["stats", "reports", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = value["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["kind"], "radial");
    assert_eq!(rows[0]["label"], "Pos_7");
    assert_eq!(rows[0]["fail_count"], 1);
    assert_eq!(value["summary"]["total_files"], 2);
}

#[test]
fn test_stats_no_merge_lists_axes() {
    let tmp = setup_pair_reports();
    cmma(&tmp)
        .args(["stats", "reports", "--no-merge", "-f", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("7,Pos_7[X座標],axis"))
        .stdout(predicate::str::contains("8,Pos_7[Y座標],axis"));
}

#[test]
fn test_stats_radial_override() {
    let tmp = setup_pair_reports();
    let output = cmma(&tmp)
        .args(["stats", "reports", "--radial-tol", "0.1", "-f", "json"])
        .output()
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["rows"][0]["fail_count"], 0);
}

#[test]
fn test_stats_strict_conflict() {
    let tmp = TempDir::new().unwrap();
    write_report(
        tmp.path(),
        "a.csv",
        &["1,Hole[X座標],1,1,0.1,-0.1,mm,OK", "2,Hole,1,1,0.1,-0.1,mm,OK"],
    );

    cmma(&tmp)
        .args(["stats", "a.csv"])
        .assert()
        .success()
        .stderr(predicate::str::contains("(excluded)"));

    cmma(&tmp)
        .args(["stats", "a.csv", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("inconsistent label classification"));
}

#[test]
fn test_stats_export_has_bom() {
    let tmp = setup_length_reports();
    cmma(&tmp)
        .args(["stats", "reports", "-o", "stats.csv", "-q"])
        .assert()
        .success();

    let bytes = fs::read(tmp.path().join("stats.csv")).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
    assert!(text.contains("1,Length,1D,2,1,50.0%"));
}

// ============================================================================
// Tolerance and Report Tests
// ============================================================================

#[test]
fn test_tolerance_detail() {
    let tmp = setup_length_reports();
    cmma(&tmp)
        .args(["tolerance", "reports", "--no", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Length"))
        .stdout(predicate::str::contains("99.73%"))
        .stdout(predicate::str::contains("At 90.00% yield: spec tight"));
}

#[test]
fn test_tolerance_unknown_item() {
    let tmp = setup_length_reports();
    cmma(&tmp)
        .args(["tolerance", "reports", "--no", "99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No records for item 99"));
}

#[test]
fn test_report_markdown() {
    let tmp = setup_length_reports();
    cmma(&tmp)
        .args(["report", "reports"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# CMM Inspection Report"))
        .stdout(predicate::str::contains("## Failing Items"))
        .stdout(predicate::str::contains("| Length"));
}

#[test]
fn test_report_to_file() {
    let tmp = setup_length_reports();
    cmma(&tmp)
        .args(["report", "reports", "-o", "report.md"])
        .assert()
        .success();

    let content = fs::read_to_string(tmp.path().join("report.md")).unwrap();
    assert!(content.contains("- Files: 2"));
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_keys() {
    let tmp = TempDir::new().unwrap();
    cmma(&tmp)
        .args(["config", "keys"])
        .assert()
        .success()
        .stdout(predicate::str::contains("target_yield"))
        .stdout(predicate::str::contains("encodings"));
}

#[test]
fn test_config_show_reads_project_file() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join(".cmma")).unwrap();
    fs::write(tmp.path().join(".cmma").join("config.yaml"), "target_yield: 0.95\n").unwrap();

    cmma(&tmp)
        .args(["config", "show", "target_yield"])
        .assert()
        .success()
        .stdout(predicate::str::diff("0.95\n"));
}

#[test]
fn test_config_env_override() {
    let tmp = TempDir::new().unwrap();
    cmma(&tmp)
        .env("CMMA_TARGET_YIELD", "0.99")
        .args(["config", "show", "target_yield"])
        .assert()
        .success()
        .stdout(predicate::str::diff("0.99\n"));
}

#[test]
fn test_config_out_of_range_env_yield_is_reported() {
    let tmp = TempDir::new().unwrap();
    cmma(&tmp)
        .env("CMMA_TARGET_YIELD", "95")
        .args(["config", "show", "target_yield"])
        .assert()
        .success()
        .stdout(predicate::str::diff("0.9\n"))
        .stderr(predicate::str::contains("ignoring CMMA_TARGET_YIELD"));
}

#[test]
fn test_malformed_project_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join(".cmma")).unwrap();
    fs::write(tmp.path().join(".cmma").join("config.yaml"), "target_yield: [0.9\n").unwrap();

    cmma(&tmp)
        .args(["config", "show", "target_yield"])
        .assert()
        .success()
        .stdout(predicate::str::diff("0.9\n"))
        .stderr(predicate::str::contains("ignoring malformed config"));
}
