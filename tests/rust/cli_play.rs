use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn cli_dry_run_prints_commands() {
    let dir = tempdir().expect("create tempdir");
    let song = super::fixtures::write_song(dir.path());

    let mut cmd = Command::cargo_bin("keylight").expect("binary not found");
    cmd.current_dir(dir.path())
        .args(["play", "--dry-run", "--default-duration-ms", "50"])
        .arg(&song);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("ON 75"))
        .stdout(predicate::str::contains("OFF 75"))
        .stdout(predicate::str::contains("OFF 82"));
}

#[test]
fn cli_play_missing_file_fails() {
    let dir = tempdir().expect("create tempdir");

    let mut cmd = Command::cargo_bin("keylight").expect("binary not found");
    cmd.current_dir(dir.path())
        .args(["play", "--dry-run", "missing.mid"]);
    cmd.assert().failure();
}
