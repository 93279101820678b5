//! CLI integration tests for stressburst
//!
//! These tests verify the CLI interface works correctly.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn stressburst() -> Command {
    Command::cargo_bin("stressburst").unwrap()
}

mod help_and_version {
    use super::*;

    #[test]
    fn help_displays_usage() {
        stressburst()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("burst"))
            .stdout(predicate::str::contains("run"))
            .stdout(predicate::str::contains("init"));
    }

    #[test]
    fn version_displays_version() {
        stressburst()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn run_help_shows_options() {
        stressburst()
            .args(["run", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--concurrency"))
            .stdout(predicate::str::contains("--method"))
            .stdout(predicate::str::contains("--body"))
            .stdout(predicate::str::contains("--stop-after"));
    }
}

mod run_validation {
    use super::*;

    #[test]
    fn run_without_url_fails() {
        stressburst()
            .arg("run")
            .assert()
            .failure()
            .stderr(predicate::str::contains("required"));
    }

    #[test]
    fn invalid_url_fails() {
        stressburst()
            .args(["run", "not a url"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid URL"));
    }

    #[test]
    fn unsupported_scheme_fails() {
        stressburst()
            .args(["run", "ftp://example.com/file"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unsupported URL scheme"));
    }

    #[test]
    fn zero_concurrency_fails() {
        stressburst()
            .args(["run", "http://localhost:1/", "-c", "0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Concurrency must be between 1 and 10000"));
    }

    #[test]
    fn excessive_concurrency_fails() {
        stressburst()
            .args(["run", "http://localhost:1/", "-c", "10001"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Concurrency"));
    }

    #[test]
    fn unsupported_method_fails() {
        stressburst()
            .args(["run", "http://localhost:1/", "-m", "DELETE"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unsupported HTTP method"));
    }

    #[test]
    fn body_and_body_file_conflict() {
        stressburst()
            .args([
                "run",
                "http://localhost:1/",
                "-b",
                "{}",
                "--body-file",
                "body.json",
            ])
            .assert()
            .failure();
    }
}

mod init {
    use super::*;

    #[test]
    fn init_writes_config() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("burst.toml");

        stressburst()
            .args([
                "init",
                "-o",
                output.to_str().unwrap(),
                "-u",
                "http://api.local/health",
            ])
            .assert()
            .success()
            .stderr(predicate::str::contains("Created config file"));

        let content = fs::read_to_string(&output).unwrap();
        assert!(content.contains(r#"url = "http://api.local/health""#));
        assert!(content.contains("concurrency = 5"));
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("burst.toml");
        fs::write(&output, "existing").unwrap();

        stressburst()
            .args(["init", "-o", output.to_str().unwrap()])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));

        stressburst()
            .args(["init", "-o", output.to_str().unwrap(), "--force"])
            .assert()
            .success();
        assert_ne!(fs::read_to_string(&output).unwrap(), "existing");
    }
}
