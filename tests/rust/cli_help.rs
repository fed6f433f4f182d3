use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn cli_prints_help() {
    let mut cmd = Command::cargo_bin("keylight").expect("binary not found");
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("keylight"))
        .stdout(predicate::str::contains("play"))
        .stdout(predicate::str::contains("ports"));
}

#[test]
fn cli_play_help_lists_overrides() {
    let mut cmd = Command::cargo_bin("keylight").expect("binary not found");
    cmd.args(["play", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--baud"));
}
