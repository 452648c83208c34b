use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("pdfscrub").unwrap()
}

#[test]
fn help_flag_prints_usage_with_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("clean"))
        .stdout(predicate::str::contains("redact"));
}

#[test]
fn clean_subcommand_help() {
    cmd()
        .args(["clean", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FILE"))
        .stdout(predicate::str::contains("--pages"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--keep-resources"));
}

#[test]
fn redact_subcommand_help() {
    cmd()
        .args(["redact", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--remove"))
        .stdout(predicate::str::contains("--format"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pdfscrub"));
}

#[test]
fn no_subcommand_fails() {
    cmd().assert().failure();
}

#[test]
fn redact_without_remove_fails() {
    cmd()
        .args(["redact", "in.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--remove"));
}

#[test]
fn missing_file_reports_error() {
    cmd()
        .args(["clean", "/nonexistent/file.pdf"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("file not found"));
}
