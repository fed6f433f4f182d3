use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn cli_inspect_prints_durations() {
    let dir = tempdir().expect("create tempdir");
    let song = super::fixtures::write_song(dir.path());

    let mut cmd = Command::cargo_bin("keylight").expect("binary not found");
    cmd.current_dir(dir.path()).arg("inspect").arg(&song);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("C4"))
        .stdout(predicate::str::contains("125ms"))
        .stdout(predicate::str::contains("Never released"));

    // first run writes the default config next to the score
    assert!(dir.path().join("keylight.json").exists());
}

#[test]
fn cli_inspect_rejects_non_midi() {
    let dir = tempdir().expect("create tempdir");
    let bogus = dir.path().join("notes.mid");
    std::fs::write(&bogus, b"not a midi file").expect("write file");

    let mut cmd = Command::cargo_bin("keylight").expect("binary not found");
    cmd.current_dir(dir.path()).arg("inspect").arg(&bogus);
    cmd.assert().failure();
}
