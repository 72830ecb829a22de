use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("clipscribe")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("download-video")
                .and(predicate::str::contains("download-audio"))
                .and(predicate::str::contains("extract-text"))
                .and(predicate::str::contains("transcribe")),
        );
}

#[test]
fn test_unknown_subcommand_fails() {
    Command::cargo_bin("clipscribe")
        .unwrap()
        .arg("frobnicate")
        .assert()
        .failure();
}
