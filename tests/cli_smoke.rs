//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn help_lists_the_snapshot_subcommand() {
    let mut cmd = cargo_bin_cmd!("sanctl");
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("snapshot"));
}

#[test]
fn running_without_a_subcommand_shows_usage_and_fails() {
    let mut cmd = cargo_bin_cmd!("sanctl");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
