//! Tests for CLI argument parsing and end-to-end runs of the binary

mod common;

use assert_cmd::Command;
use clap::Parser;
use common::{create_temp_dta, create_test_dataset, write_fixture};
use predicates::prelude::*;
use rbstata::cli::{Cli, FileSelection};
use rbstata::pipeline::dta::{read_dta_metadata, Release};
use tempfile::TempDir;

fn rbstata(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("rbstata").unwrap();
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_default_values() {
    let cli = Cli::parse_from(["rbstata", "auto.dta"]);

    assert_eq!(cli.files, vec!["auto.dta"]);
    assert_eq!(cli.target_version, None);
    assert!(!cli.all, "Default all should be false");
    assert!(!cli.recursive, "Default recursive should be false");
    assert!(!cli.overwrite, "Default overwrite should be false");
    assert!(!cli.verbose, "Default verbose should be false");
    assert!(!cli.lowercase, "File names keep their case by default");
    assert_eq!(cli.suffix, None);
    assert_eq!(cli.output, None);
}

#[test]
fn test_cli_short_flags() {
    let cli = Cli::parse_from([
        "rbstata", "a.dta", "b.dta", "-t", "12", "-s", "-old", "-w", "-v", "-r",
    ]);

    assert_eq!(cli.files, vec!["a.dta", "b.dta"]);
    assert_eq!(cli.target_version, Some(12));
    assert_eq!(cli.suffix.as_deref(), Some("-old"));
    assert!(cli.overwrite);
    assert!(cli.verbose);
    assert!(cli.recursive);

    let settings = cli.settings(12);
    assert!(settings.policy.overwrite);
    assert_eq!(
        settings.files,
        FileSelection::Listed(vec!["a.dta".to_string(), "b.dta".to_string()])
    );
}

#[test]
fn test_cli_rejects_non_integer_version() {
    assert!(Cli::try_parse_from(["rbstata", "a.dta", "-t", "thirteen"]).is_err());
}

#[test]
fn test_batch_reports_errors_and_continues() {
    let temp_dir = TempDir::new().unwrap();
    let dataset = create_test_dataset();
    write_fixture(temp_dir.path(), "a.dta", &dataset, Release::V118);
    write_fixture(temp_dir.path(), "b.dta", &dataset, Release::V118);

    rbstata(temp_dir.path())
        .args(["a.dta", "missing.dta", "b.dta", "-t", "13"])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "Error: missing.dta is not a valid path to a dta file.",
        ))
        .stdout(predicate::str::contains("Success: Conversions complete."));

    for name in ["a-rbstata.dta", "b-rbstata.dta"] {
        let metadata = read_dta_metadata(&temp_dir.path().join(name)).unwrap();
        assert_eq!(metadata.release, Release::V117);
    }
    assert!(!temp_dir.path().join("missing-rbstata.dta").exists());
}

#[test]
fn test_batch_continues_past_unreadable_file() {
    let temp_dir = TempDir::new().unwrap();
    write_fixture(temp_dir.path(), "a.dta", &create_test_dataset(), Release::V118);
    std::fs::write(temp_dir.path().join("corrupt.dta"), b"not a dta file").unwrap();

    rbstata(temp_dir.path())
        .args(["corrupt.dta", "a.dta", "-t", "12"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Error:"))
        .stdout(predicate::str::contains("Success: Conversions complete."));

    assert!(temp_dir.path().join("a-rbstata.dta").exists());
    assert!(!temp_dir.path().join("corrupt-rbstata.dta").exists());
}

#[test]
fn test_single_invalid_file_fails() {
    let temp_dir = TempDir::new().unwrap();

    rbstata(temp_dir.path())
        .args(["dummy.dta", "-t", "13"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "Error: dummy.dta is not a valid path to a dta file.",
        ));
}

#[test]
fn test_unsupported_version_fails() {
    let (temp_dir, _) = create_temp_dta("auto.dta");

    rbstata(temp_dir.path())
        .args(["auto.dta", "-t", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not supported"));
    assert!(!temp_dir.path().join("auto-rbstata.dta").exists());
}

#[test]
fn test_single_file_explicit_output_and_verbose() {
    let (temp_dir, _) = create_temp_dta("auto.dta");

    rbstata(temp_dir.path())
        .args(["auto.dta", "-t", "12", "-o", "old.dta", "-v"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "+ Converted: auto.dta to old.dta in version 12.",
        ))
        .stdout(predicate::str::contains("Success: Conversions complete."));

    let metadata = read_dta_metadata(&temp_dir.path().join("old.dta")).unwrap();
    assert_eq!(metadata.release, Release::V114);
}

#[test]
fn test_extension_and_whitespace_are_normalized() {
    let (temp_dir, _) = create_temp_dta("auto.dta");

    rbstata(temp_dir.path())
        .args([" au to ", "-t", "14", "-s", "-old"])
        .assert()
        .success();

    assert!(temp_dir.path().join("auto-old.dta").exists());
}

#[test]
fn test_version_suffix_names_output() {
    let (temp_dir, _) = create_temp_dta("auto.dta");

    rbstata(temp_dir.path())
        .args(["auto", "-t", "13", "--version-suffix"])
        .assert()
        .success();

    assert!(temp_dir.path().join("auto-v13.dta").exists());
}

#[test]
fn test_overwrite_warns_and_rewrites_source() {
    let (temp_dir, input) = create_temp_dta("auto.dta");

    rbstata(temp_dir.path())
        .args(["auto.dta", "-t", "10", "-w"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "+ Warning: you are writing over original input dta file.",
        ));

    assert_eq!(read_dta_metadata(&input).unwrap().release, Release::V114);
}

#[test]
fn test_all_discovers_shallow_and_recursive() {
    let temp_dir = TempDir::new().unwrap();
    let dataset = create_test_dataset();
    std::fs::create_dir(temp_dir.path().join("sub")).unwrap();
    write_fixture(temp_dir.path(), "a.dta", &dataset, Release::V118);
    write_fixture(temp_dir.path(), "b.dta", &dataset, Release::V118);
    write_fixture(&temp_dir.path().join("sub"), "c.dta", &dataset, Release::V118);

    rbstata(temp_dir.path())
        .args(["-a", "-t", "13", "-s", "-v13"])
        .assert()
        .success();
    assert!(temp_dir.path().join("a-v13.dta").exists());
    assert!(temp_dir.path().join("b-v13.dta").exists());
    assert!(!temp_dir.path().join("sub").join("c-v13.dta").exists());

    rbstata(temp_dir.path())
        .args(["-a", "-r", "-t", "12", "-s", "-v12"])
        .assert()
        .success();
    assert!(temp_dir.path().join("sub").join("c-v12.dta").exists());
}

#[test]
fn test_nothing_to_convert() {
    let temp_dir = TempDir::new().unwrap();

    rbstata(temp_dir.path())
        .args(["-a", "-t", "13"])
        .assert()
        .success()
        .stdout(predicate::str::contains("+ Nothing to convert."));
}

#[test]
fn test_batch_ignores_explicit_output() {
    let temp_dir = TempDir::new().unwrap();
    let dataset = create_test_dataset();
    write_fixture(temp_dir.path(), "a.dta", &dataset, Release::V118);
    write_fixture(temp_dir.path(), "b.dta", &dataset, Release::V118);

    rbstata(temp_dir.path())
        .args(["a.dta", "b.dta", "-t", "13", "-o", "one.dta"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ignored"));

    assert!(!temp_dir.path().join("one.dta").exists());
    assert!(temp_dir.path().join("a-rbstata.dta").exists());
}
