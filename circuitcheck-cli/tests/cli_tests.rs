//! CLI integration tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::PathBuf;

/// Build command for the circuitcheck-cli binary.
fn circuitcheck_cli() -> Command {
    Command::cargo_bin("circuitcheck-cli").unwrap()
}

/// Path to circuitcheck library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("circuitcheck")
        .join("tests")
        .join("fixtures")
}

#[test]
fn test_cli_help() {
    let mut cmd = circuitcheck_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("stability"));
}

#[test]
fn test_cli_version() {
    let mut cmd = circuitcheck_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_soa_extraction() {
    let mut cmd = circuitcheck_cli();

    cmd.arg("soa").arg(fixtures_dir().join("irf540n.txt"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Vds_max: 100"))
        .stdout(predicate::str::contains("Id_max: 33"));
}

#[test]
fn test_cli_soa_with_operating_conditions() {
    let mut cmd = circuitcheck_cli();

    cmd.arg("soa")
        .arg(fixtures_dir().join("irf540n.txt"))
        .arg("--operating")
        .arg(fixtures_dir().join("operating.yaml"))
        .arg("--reference")
        .arg("Q1");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Compliance:"))
        .stdout(predicate::str::contains("[ok]"));
}

#[test]
fn test_cli_soa_json_output() {
    let mut cmd = circuitcheck_cli();

    cmd.arg("soa")
        .arg(fixtures_dir().join("irf540n.txt"))
        .arg("--format")
        .arg("json");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"Vds_max\": 100.0"));
}

#[test]
fn test_cli_soa_fail_on_violation() {
    let dir = tempfile::tempdir().unwrap();
    let datasheet = dir.path().join("small_fet.txt");
    std::fs::write(&datasheet, "Absolute Maximum Ratings\nVds 20 V\nId 2 A\n").unwrap();
    let operating = dir.path().join("operating.yaml");
    let mut f = std::fs::File::create(&operating).unwrap();
    writeln!(f, "Q1:\n  Vds: 30.0").unwrap();

    let mut cmd = circuitcheck_cli();
    cmd.arg("soa")
        .arg(&datasheet)
        .arg("--operating")
        .arg(&operating)
        .arg("--reference")
        .arg("Q1")
        .arg("--fail-on-violation");
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("violation"));
}

#[test]
fn test_cli_soa_missing_file() {
    let mut cmd = circuitcheck_cli();

    cmd.arg("soa").arg("/nonexistent/datasheet.txt");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_cli_stability() {
    let mut cmd = circuitcheck_cli();

    // Succeeds whether ngspice is installed or not; the outcome differs.
    cmd.arg("stability").arg(fixtures_dir().join("rc_lowpass.cir"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Stability"));
}

#[test]
fn test_cli_stability_unknown_node() {
    let mut cmd = circuitcheck_cli();

    cmd.arg("stability")
        .arg(fixtures_dir().join("rc_lowpass.cir"))
        .arg("--output")
        .arg("vout");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("unavailable"));
}

#[test]
fn test_cli_report_markdown() {
    let mut cmd = circuitcheck_cli();

    // Fixture datasheets are named by part, so only references without a
    // matching file show up as notes; the report still renders.
    cmd.arg("report")
        .arg(fixtures_dir().join("operating.yaml"))
        .arg("--datasheets")
        .arg(fixtures_dir())
        .arg("--project")
        .arg("cli-test");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("# Circuit Safety Report: cli-test"));
}

#[test]
fn test_cli_report_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let datasheet_dir = dir.path().join("sheets");
    std::fs::create_dir(&datasheet_dir).unwrap();
    std::fs::write(
        datasheet_dir.join("Q1.txt"),
        "Absolute Maximum Ratings\nVds 100 V\nId 33 A\n",
    )
    .unwrap();
    let conditions = dir.path().join("operating.yaml");
    std::fs::write(&conditions, "Q1:\n  Vds: 24.0\n").unwrap();
    let out = dir.path().join("report.md");

    let mut cmd = circuitcheck_cli();
    cmd.arg("report")
        .arg(&conditions)
        .arg("--datasheets")
        .arg(&datasheet_dir)
        .arg("-o")
        .arg(&out);
    cmd.assert().success();

    let rendered = std::fs::read_to_string(&out).unwrap();
    assert!(rendered.contains("Q1"));
    assert!(rendered.contains("Vds_max: 100"));
}

#[test]
fn test_cli_patterns() {
    let mut cmd = circuitcheck_cli();

    cmd.arg("patterns").arg("--verbose");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Vds_max"))
        .stdout(predicate::str::contains("labels:"));
}

#[test]
fn test_cli_enrich_without_providers() {
    // No API keys configured: records pass through unchanged.
    let mut cmd = circuitcheck_cli();
    cmd.env_remove("OCTOPART_TOKEN").env_remove("MOUSER_API_KEY");

    cmd.arg("enrich").arg(fixtures_dir().join("bom.csv"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"reference\": \"Q1\""))
        .stderr(predicate::str::contains("Enriched 0"));
}
