//! Tests of the `teelog` binary
//!
//! These tests run the real executable:
//! - A FATAL record is on disk when the process exits with status 1
//! - A malformed configuration stops startup with status 2 and no files
//! - `check` prints the routing table

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    config: PathBuf,
    info: PathBuf,
    error: PathBuf,
}

impl Fixture {
    fn new(mode: &str, info_max_size: &str) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let info = dir.path().join("logs").join("info.log");
        let error = dir.path().join("logs").join("error.log");
        let config = dir.path().join("teelog.toml");
        let body = format!(
            r#"
            [TEELOG]
            MODE = "{mode}"

            [TEELOG.INFO]
            FILE_PATH_NAME = "{}"
            MAXSIZE = {info_max_size}
            MAXBACKUP_COUNT = 3
            MAXAGE = 7
            COMPRESS = false

            [TEELOG.ERROR]
            FILE_PATH_NAME = "{}"
            MAXSIZE = 1
            MAXBACKUP_COUNT = 3
            MAXAGE = 7
            COMPRESS = true
            "#,
            info.display(),
            error.display()
        );
        fs::write(&config, body).expect("write config");
        Self {
            dir,
            config,
            info,
            error,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("teelog").expect("binary is built");
        cmd.env_remove("TEELOG_CONFIG")
            .env_remove("RUST_LOG")
            .current_dir(self.dir.path())
            .arg("--config")
            .arg(&self.config);
        cmd
    }
}

fn read_records(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).expect("every line is one JSON record"))
        .collect()
}

// ============================================================================
// Test: Emit
// ============================================================================

#[test]
fn test_fatal_exits_after_record_is_written() {
    let fixture = Fixture::new("contain", "1");

    fixture
        .command()
        .args(["emit", "--level", "fatal", "disk", "failure"])
        .assert()
        .code(1);

    for path in [&fixture.info, &fixture.error] {
        let records = read_records(path);
        assert_eq!(records.len(), 1, "{}", path.display());
        assert_eq!(records[0]["level"], "FATAL");
        assert_eq!(records[0]["msg"], "disk failure");
    }
}

#[test]
fn test_warn_goes_only_to_info_file_when_independent() {
    let fixture = Fixture::new("independent", "1");

    fixture
        .command()
        .args(["emit", "--level", "warn", "--template", "retry {} of {}", "2", "5"])
        .args(["--field", "job=backup", "--field", "attempt=2"])
        .assert()
        .success();

    let records = read_records(&fixture.info);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["msg"], "retry 2 of 5");
    assert_eq!(records[0]["job"], "backup");
    assert_eq!(records[0]["attempt"], 2);
    assert!(!fixture.error.exists());
}

#[test]
fn test_error_is_teed_when_contain() {
    let fixture = Fixture::new("contain", "1");

    fixture
        .command()
        .args(["emit", "--level", "error", "upstream", "timeout"])
        .assert()
        .success();

    assert_eq!(read_records(&fixture.info).len(), 1);
    assert_eq!(read_records(&fixture.error).len(), 1);
}

#[test]
fn test_debug_is_dropped() {
    let fixture = Fixture::new("contain", "1");

    fixture
        .command()
        .args(["emit", "--level", "debug", "noise"])
        .assert()
        .success();

    assert!(!fixture.info.exists());
    assert!(!fixture.error.exists());
}

// ============================================================================
// Test: Configuration Errors
// ============================================================================

#[test]
fn test_malformed_max_size_stops_startup() {
    let fixture = Fixture::new("contain", "\"abc\"");

    fixture
        .command()
        .args(["emit", "--level", "error", "never", "written"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("INFO MAXSIZE"));

    assert!(!fixture.info.exists());
    assert!(!fixture.error.exists());
}

#[test]
fn test_missing_config_file_stops_startup() {
    let dir = TempDir::new().expect("create temp dir");

    Command::cargo_bin("teelog")
        .expect("binary is built")
        .env_remove("TEELOG_CONFIG")
        .current_dir(dir.path())
        .args(["emit", "hello"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("teelog.toml"));
}

#[test]
fn test_config_path_from_environment() {
    let fixture = Fixture::new("independent", "1");

    Command::cargo_bin("teelog")
        .expect("binary is built")
        .env("TEELOG_CONFIG", &fixture.config)
        .args(["emit", "--level", "info", "from", "env"])
        .assert()
        .success();

    assert_eq!(read_records(&fixture.info)[0]["msg"], "from env");
}

// ============================================================================
// Test: Check
// ============================================================================

#[test]
fn test_check_prints_routing_table() {
    let fixture = Fixture::new("independent", "1");

    fixture
        .command()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("mode: independent"))
        .stdout(predicate::str::contains("accepts INFO, WARN ("))
        .stdout(predicate::str::contains("accepts ERROR, FATAL ("))
        .stdout(predicate::str::contains("compress true"));

    assert!(!fixture.info.exists());
}

#[test]
fn test_check_rejects_invalid_compress() {
    let fixture = Fixture::new("contain", "1");
    let body = fs::read_to_string(&fixture.config)
        .expect("read config")
        .replace("COMPRESS = true", "COMPRESS = \"maybe\"");
    fs::write(&fixture.config, body).expect("rewrite config");

    fixture
        .command()
        .arg("check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("ERROR COMPRESS"));
}
