//! CLI integration tests for fanrun
//!
//! These run the real binary and check what reaches stdout, stderr and the
//! exit code.

use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command instance for the fanrun binary, isolated from any user config.
fn fanrun_cmd(config_dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("fanrun").unwrap();
    cmd.env("FANRUN_CONFIG", config_dir.path().join("config.toml"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stdout_lines(output: &std::process::Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Dry-run
// =============================================================================

#[test]
fn test_dry_run_prints_cross_product_in_order() {
    let dir = TempDir::new().unwrap();
    let output = fanrun_cmd(&dir)
        .args(["-d", "-a", "1 2", "-a", "a b", "echo {}"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec!["echo 1 a", "echo 1 b", "echo 2 a", "echo 2 b"]
    );
}

#[test]
fn test_dry_run_expands_ranges() {
    let dir = TempDir::new().unwrap();
    fanrun_cmd(&dir)
        .args(["--dry-run", "-a", "{01..03}", "touch file-{}.txt"])
        .assert()
        .success()
        .stdout("touch file-01.txt\ntouch file-02.txt\ntouch file-03.txt\n");
}

#[test]
fn test_arg_file_lines_form_a_list() {
    let dir = TempDir::new().unwrap();
    let names = dir.path().join("names.txt");
    fs::write(&names, "ann\n\nbob\n").unwrap();

    fanrun_cmd(&dir)
        .args(["-d", "-a", "hi bye", "-f"])
        .arg(&names)
        .arg("say {} {}")
        .assert()
        .success()
        .stdout("say hi ann\nsay hi bob\nsay bye ann\nsay bye bob\n");
}

#[test]
fn test_stdin_alone_is_the_task_list() {
    let dir = TempDir::new().unwrap();
    fanrun_cmd(&dir)
        .args(["-d", "gzip {}"])
        .write_stdin("a.log\n\n b.log \n")
        .assert()
        .success()
        .stdout("gzip a.log\ngzip b.log\n");
}

// =============================================================================
// Real execution (needs a POSIX shell)
// =============================================================================

#[cfg(unix)]
#[test]
fn test_end_to_end_unordered_runs_every_combination() {
    let dir = TempDir::new().unwrap();
    let output = fanrun_cmd(&dir)
        .args(["-s", "4", "-a", "1 2", "-a", "a b", "echo {}"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let mut lines = stdout_lines(&output);
    lines.sort();
    assert_eq!(lines, vec!["1 a", "1 b", "2 a", "2 b"]);
}

#[cfg(unix)]
#[test]
fn test_keep_order_output_follows_input_order() {
    let dir = TempDir::new().unwrap();
    fanrun_cmd(&dir)
        .args(["-k", "-s", "3", "-a", "0.3 0.2 0.1", "sleep {} && echo done-{}"])
        .assert()
        .success()
        .stdout("done-0.3\ndone-0.2\ndone-0.1\n");
}

#[cfg(unix)]
#[test]
fn test_failed_invocation_is_reported_but_not_fatal() {
    let dir = TempDir::new().unwrap();
    fanrun_cmd(&dir)
        .args(["-k", "-a", "0 3 0", "echo start; exit"])
        .assert()
        .success()
        .stdout("start\nstart\nstart\n")
        .stderr(predicate::str::contains("exited with 3"));
}

#[cfg(unix)]
#[test]
fn test_glob_expands_to_files() {
    let dir = TempDir::new().unwrap();
    let work = dir.path().join("work");
    fs::create_dir(&work).unwrap();
    fs::write(work.join("one.txt"), "1").unwrap();
    fs::write(work.join("two.txt"), "2").unwrap();
    fs::create_dir(work.join("dir.txt")).unwrap();

    fanrun_cmd(&dir)
        .current_dir(&work)
        .args(["-k", "-a", "*.txt", "cat"])
        .assert()
        .success()
        .stdout("12");
}

#[test]
fn test_glob_in_subdirectory_yields_file_names() {
    let dir = TempDir::new().unwrap();
    let work = dir.path().join("work");
    fs::create_dir(&work).unwrap();
    fs::write(work.join("one.txt"), "1").unwrap();
    fs::write(work.join("two.txt"), "2").unwrap();

    fanrun_cmd(&dir)
        .current_dir(dir.path())
        .args(["-d", "-a", "work/*.txt", "gzip {}"])
        .assert()
        .success()
        .stdout("gzip one.txt\ngzip two.txt\n");
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_malformed_range_exits_with_failure() {
    let dir = TempDir::new().unwrap();
    fanrun_cmd(&dir)
        .args(["-d", "-a", "{1..x}", "echo {}"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Malformed range expression"));
}

#[test]
fn test_missing_arg_file_exits_with_failure() {
    let dir = TempDir::new().unwrap();
    fanrun_cmd(&dir)
        .args(["-d", "-f", "does-not-exist.txt", "echo {}"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does-not-exist.txt"));
}

#[test]
fn test_config_file_is_honoured() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.toml"), "slots = 1\nkeep_order = true\n").unwrap();
    fanrun_cmd(&dir)
        .args(["-d", "-a", "x y", "echo"])
        .assert()
        .success()
        .stdout("echo x\necho y\n");

    fs::write(dir.path().join("config.toml"), "slots = [1]\n").unwrap();
    fanrun_cmd(&dir)
        .args(["-d", "-a", "x", "echo"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse config file"));
}
