use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn cli_keys_prints_piano_numbers() {
    let dir = tempdir().expect("create tempdir");
    let song = super::fixtures::write_song(dir.path());

    let mut cmd = Command::cargo_bin("keylight").expect("binary not found");
    cmd.current_dir(dir.path()).arg("keys").arg(&song);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("40 44"));
}
