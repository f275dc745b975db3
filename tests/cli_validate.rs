use std::path::PathBuf;
use std::{fs, path::Path};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

#[test]
fn validate_passes_for_valid_fixture() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pfsync"));
    cmd.arg("validate")
        .arg(fixture("config-valid.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("configuration is valid"));
}

#[test]
fn validate_rejects_inverted_dhcp_range() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pfsync"));
    cmd.arg("validate")
        .arg(fixture("config-bad-range.xml"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("dhcpd.lan.range"))
        .stderr(predicate::str::contains("validation failed"));
}

#[test]
fn validate_reports_empty_hostname_field() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("no-hostname.xml");
    fs::write(
        &input,
        r#"<pfsense>
            <system><hostname></hostname></system>
            <interfaces><lan><ipaddr>192.168.1.1</ipaddr><subnet>24</subnet></lan></interfaces>
        </pfsense>"#,
    )
    .expect("write");

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pfsync"));
    cmd.arg("validate")
        .arg(path_as_str(&input))
        .assert()
        .failure()
        .stdout(predicate::str::contains("system.hostname"));
}

#[test]
fn validate_tolerates_sentinel_range_endpoint() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("sentinel.xml");
    fs::write(
        &input,
        r#"<pfsense>
            <system><hostname>edge</hostname></system>
            <interfaces><lan><ipaddr>192.168.1.1</ipaddr><subnet>24</subnet></lan></interfaces>
            <dhcpd><lan><range><from>dhcp</from><to>192.168.1.100</to></range></lan></dhcpd>
        </pfsense>"#,
    )
    .expect("write");

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pfsync"));
    cmd.arg("validate")
        .arg(path_as_str(&input))
        .assert()
        .success()
        .stdout(predicate::str::contains("configuration is valid"));
}

#[test]
fn validate_json_format_names_the_field() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pfsync"));
    cmd.arg("validate")
        .arg(fixture("config-bad-range.xml"))
        .arg("--format")
        .arg("json")
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""field": "dhcpd.lan.range""#));
}

#[test]
fn validate_fails_on_missing_file() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pfsync"));
    cmd.arg("validate")
        .arg("does-not-exist.xml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

#[test]
fn validate_fails_on_schema_mismatch() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("no-interfaces.xml");
    fs::write(&input, r#"<pfsense><system><hostname>edge</hostname></system></pfsense>"#)
        .expect("write");

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pfsync"));
    cmd.arg("validate")
        .arg(path_as_str(&input))
        .assert()
        .failure()
        .stderr(predicate::str::contains("required field missing: interfaces"));
}

fn path_as_str(path: &Path) -> &str {
    path.to_str().expect("utf8 path")
}
