//! Exit status and failure output of the `chunkbench` binary.
#![allow(missing_docs)]

use std::process::{Command, Output};

fn chunkbench(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chunkbench"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn cli_chunk_size_not_multiple() {
    let dir = tempfile::tempdir().unwrap();
    let basename = dir.path().join("not_multiple");
    let output = chunkbench(&["--chunk-size", "7", "--basename", basename.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = stdout(&output);
    assert!(stdout.contains("ERROR: image number 100 is not a multiple of chunk size 7"));
    assert!(stdout.ends_with("# FAILURE\n"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn cli_negative_dimension() {
    let dir = tempfile::tempdir().unwrap();
    let basename = dir.path().join("negative");
    let output = chunkbench(&["--nx", "-5", "--basename", basename.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).ends_with("# FAILURE\n"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn cli_zero_dimension() {
    let dir = tempfile::tempdir().unwrap();
    let basename = dir.path().join("zero");
    let output = chunkbench(&["--ny", "0", "--basename", basename.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = stdout(&output);
    assert!(stdout.starts_with("ERROR: "));
    assert!(stdout.ends_with("# FAILURE\n"));
}

#[test]
fn cli_help() {
    let output = chunkbench(&["--help"]);
    assert!(output.status.success());
    assert!(!stdout(&output).contains("# FAILURE"));
}

#[test]
fn cli_success() {
    let dir = tempfile::tempdir().unwrap();
    let basename = dir.path().join("ok");
    let output = chunkbench(&[
        "--nx",
        "8",
        "--ny",
        "4",
        "--nimages",
        "4",
        "--chunk-size",
        "2",
        "--basename",
        basename.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("#RESULTS raw filesize [Byte]         : 128\n"));
    assert!(!stdout.contains("# FAILURE"));
}
