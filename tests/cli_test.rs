//! Binary-level tests: exit codes and where messages go.
//!
//! Only paths that stop before any request is sent are exercised here.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

use vtscan::exitcode;

fn vtscan(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("vtscan");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn given_no_arguments_then_usage_and_success() {
    let home = TempDir::new().expect("temp home");
    vtscan(&home)
        .assert()
        .code(exitcode::OK)
        .stdout(predicate::str::contains("Usage: vtscan --apikey <KEY>"));
}

#[test]
fn given_help_then_usage_and_success() {
    let home = TempDir::new().expect("temp home");
    vtscan(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--download <HASH>"));
}

#[test]
fn given_scan_without_key_then_message_on_stdout_and_exit_one() {
    let home = TempDir::new().expect("temp home");
    vtscan(&home)
        .args(["--filescan", "sample.exe"])
        .assert()
        .code(exitcode::FAILURE)
        .stdout(predicate::str::diff("Must set --apikey first\n"));
}

#[test]
fn given_download_without_out_then_exit_one() {
    let home = TempDir::new().expect("temp home");
    vtscan(&home)
        .args(["--apikey", "K", "--download", "abc"])
        .assert()
        .code(exitcode::FAILURE)
        .stdout(predicate::str::contains("Must set --out first"));
}

#[test]
fn given_unknown_flag_only_then_diagnostic_and_success() {
    let home = TempDir::new().expect("temp home");
    vtscan(&home)
        .args(["--bogus", "left"])
        .assert()
        .success()
        .stdout(predicate::str::diff(
            "?? unrecognized option '--bogus' ??\nnon-option ARGV-elements: left\n",
        ));
}

#[test]
fn given_invalid_config_then_config_exit_code() {
    let home = TempDir::new().expect("temp home");
    let config_dir = home.path().join(".config").join("vtscan");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("vtscan.toml"), "timeout_secs = 0\n").unwrap();

    vtscan(&home)
        .args(["--apikey", "K"])
        .assert()
        .code(exitcode::CONFIG)
        .stderr(predicate::str::contains("timeout_secs"));
}
