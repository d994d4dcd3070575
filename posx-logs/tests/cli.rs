use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn missing_directory_exits_cleanly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("logs");

    cargo_bin_cmd!("posx-logs")
        .arg("--dir")
        .arg(&missing)
        .arg("--no-open")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logs directory does not exist yet."));
}

#[test]
fn empty_directory_exits_cleanly() {
    let dir = tempfile::tempdir().expect("tempdir");

    cargo_bin_cmd!("posx-logs")
        .arg("--dir")
        .arg(dir.path())
        .arg("--no-open")
        .assert()
        .success()
        .stdout(predicate::str::contains("No log files found."));
}

#[test]
fn lists_files_and_tails_the_error_log() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("combined.log"), vec![b'a'; 1024]).expect("write");
    let errors: String = (1..=25).map(|n| format!("error {n}\n")).collect();
    fs::write(dir.path().join("error.log"), errors).expect("write");

    cargo_bin_cmd!("posx-logs")
        .arg("--dir")
        .arg(dir.path())
        .arg("--no-open")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. combined.log (1.00 KB)"))
        .stdout(predicate::str::contains("2. error.log"))
        .stdout(predicate::str::contains("error 25"))
        .stdout(predicate::str::contains("error 6\n"))
        .stdout(predicate::str::contains("error 5\n").not())
        .stdout(predicate::str::contains("Opening logs directory").not());
}

#[test]
fn lines_flag_limits_the_tail() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("error.log"), "first\nsecond\nthird\n").expect("write");

    cargo_bin_cmd!("posx-logs")
        .args(["--lines", "1", "--no-open", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("third"))
        .stdout(predicate::str::contains("second").not());
}

#[test]
fn help_documents_the_flags() {
    cargo_bin_cmd!("posx-logs")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dir"))
        .stdout(predicate::str::contains("--lines"))
        .stdout(predicate::str::contains("--no-open"));
}
