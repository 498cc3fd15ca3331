use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

#[allow(deprecated)]
fn report_cmd() -> Command {
    let mut cmd = Command::cargo_bin("trend-report").unwrap();
    cmd.env("RUST_LOG", "warn");
    cmd
}

#[test]
fn help_lists_overrides() {
    let assert = report_cmd().arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    for flag in ["--reviews", "--trend", "--output-dir", "--metric", "--skip-font-install"] {
        assert!(stdout.contains(flag), "missing {flag} in help output");
    }
}

#[test]
fn missing_reviews_file_fails_with_path() {
    let dir = TempDir::new().unwrap();
    let reviews = dir.path().join("absent.csv");
    let trend = dir.path().join("trend.csv");
    fs::write(&trend, "date,전체\n2024-01-01,10\n").unwrap();

    let assert = report_cmd()
        .arg("--reviews")
        .arg(&reviews)
        .arg("--trend")
        .arg(&trend)
        .arg("--output-dir")
        .arg(dir.path().join("out"))
        .arg("--skip-font-install")
        .assert()
        .failure()
        .code(1);

    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("absent.csv"));
    assert!(stderr.contains("caused by:"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn trend_without_numeric_column_fails() {
    let dir = TempDir::new().unwrap();
    let reviews = dir.path().join("reviews.csv");
    let trend = dir.path().join("trend.csv");
    fs::write(&reviews, "at,score,content\n2024-01-01 10:00:00,5,good\n").unwrap();
    fs::write(&trend, "date,label\n2024-01-01,high\n").unwrap();

    let assert = report_cmd()
        .arg("--reviews")
        .arg(&reviews)
        .arg("--trend")
        .arg(&trend)
        .arg("--output-dir")
        .arg(dir.path())
        .arg("--skip-font-install")
        .assert()
        .failure();

    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("No numeric column"));
}
