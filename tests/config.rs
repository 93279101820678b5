//! Configuration file tests
//!
//! These tests verify TOML config loading, env interpolation and CLI overrides.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn stressburst() -> Command {
    Command::cargo_bin("stressburst").unwrap()
}

async fn health_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;
    server
}

fn read_json(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

mod basic_config {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn config_file_drives_run() {
        let server = health_server().await;
        let dir = tempdir().unwrap();
        let config = dir.path().join("burst.toml");
        let output = dir.path().join("results.json");

        fs::write(
            &config,
            format!(
                r#"
[target]
url = "{}/health"
timeout = "5s"

[load]
concurrency = 4
flush_interval = "50ms"
"#,
                server.uri()
            ),
        )
        .unwrap();

        stressburst()
            .args([
                "run",
                "-f",
                config.to_str().unwrap(),
                "-q",
                "-o",
                output.to_str().unwrap(),
            ])
            .assert()
            .success();

        let json = read_json(&output);
        assert_eq!(json["metadata"]["load"]["concurrency"].as_u64(), Some(4));
        assert_eq!(json["metadata"]["load"]["timeout_ms"].as_u64(), Some(5000));
        assert_eq!(json["summary"]["succeeded"].as_u64(), Some(4));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cli_arguments_override_config() {
        let server = health_server().await;
        let dir = tempdir().unwrap();
        let config = dir.path().join("burst.toml");
        let output = dir.path().join("results.json");

        fs::write(
            &config,
            format!(
                r#"
[target]
url = "{}/health"

[load]
concurrency = 8
"#,
                server.uri()
            ),
        )
        .unwrap();

        stressburst()
            .args([
                "run",
                "-f",
                config.to_str().unwrap(),
                "-c",
                "2",
                "-q",
                "-o",
                output.to_str().unwrap(),
            ])
            .assert()
            .success();

        let json = read_json(&output);
        assert_eq!(json["summary"]["total_requests"].as_u64(), Some(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn post_body_from_config() {
        let server = health_server().await;
        let dir = tempdir().unwrap();
        let config = dir.path().join("burst.toml");
        let output = dir.path().join("results.json");

        fs::write(
            &config,
            format!(
                r#"
[target]
url = "{}/items"
method = "post"
body = '{{"name": "widget"}}'

[load]
concurrency = 1
"#,
                server.uri()
            ),
        )
        .unwrap();

        stressburst()
            .args([
                "run",
                "-f",
                config.to_str().unwrap(),
                "-q",
                "-o",
                output.to_str().unwrap(),
            ])
            .assert()
            .success();

        let json = read_json(&output);
        assert_eq!(json["metadata"]["target"]["method"], "POST");
        assert_eq!(json["requests"][0]["status_code"], 201);
    }
}

mod env_interpolation {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn generated_config_runs_as_is() {
        let server = health_server().await;
        let dir = tempdir().unwrap();
        let config = dir.path().join("burst.toml");
        let output = dir.path().join("results.json");
        let url = format!("{}/health", server.uri());

        stressburst()
            .args(["init", "-o", config.to_str().unwrap(), "-u", &url])
            .assert()
            .success();

        stressburst()
            .env_remove("API_HOST")
            .args([
                "run",
                "-f",
                config.to_str().unwrap(),
                "-c",
                "1",
                "-q",
                "-o",
                output.to_str().unwrap(),
            ])
            .assert()
            .success();

        let json = read_json(&output);
        assert_eq!(json["metadata"]["target"]["url"].as_str(), Some(url.as_str()));
        assert_eq!(json["summary"]["succeeded"].as_u64(), Some(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn env_var_with_default_is_expanded() {
        let server = health_server().await;
        let dir = tempdir().unwrap();
        let config = dir.path().join("burst.toml");
        let output = dir.path().join("results.json");

        fs::write(
            &config,
            r#"
[target]
url = "${STRESSBURST_TEST_BASE}/health"

[load]
concurrency = ${STRESSBURST_TEST_UNSET_CONCURRENCY:-1}
"#,
        )
        .unwrap();

        stressburst()
            .env("STRESSBURST_TEST_BASE", server.uri())
            .args([
                "run",
                "-f",
                config.to_str().unwrap(),
                "-q",
                "-o",
                output.to_str().unwrap(),
            ])
            .assert()
            .success();

        let json = read_json(&output);
        assert_eq!(json["summary"]["total_requests"].as_u64(), Some(1));
    }

    #[test]
    fn missing_env_var_fails() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("burst.toml");

        fs::write(
            &config,
            r#"
[target]
url = "${STRESSBURST_TEST_DEFINITELY_UNSET}/health"
"#,
        )
        .unwrap();

        stressburst()
            .env_remove("STRESSBURST_TEST_DEFINITELY_UNSET")
            .args(["run", "-f", config.to_str().unwrap()])
            .assert()
            .failure()
            .stderr(predicate::str::contains(
                "Environment variable 'STRESSBURST_TEST_DEFINITELY_UNSET' not set",
            ));
    }
}

mod invalid_config {
    use super::*;

    #[test]
    fn unknown_field_rejected() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("burst.toml");

        fs::write(
            &config,
            r#"
[target]
url = "http://localhost:1/"

[load]
duration = "10s"
"#,
        )
        .unwrap();

        stressburst()
            .args(["run", "-f", config.to_str().unwrap()])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse config file"));
    }

    #[test]
    fn zero_flush_interval_rejected() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("burst.toml");

        fs::write(
            &config,
            r#"
[target]
url = "http://localhost:1/"

[load]
flush_interval = "0s"
"#,
        )
        .unwrap();

        stressburst()
            .args(["run", "-f", config.to_str().unwrap()])
            .assert()
            .failure()
            .stderr(predicate::str::contains("flush_interval"));
    }

    #[test]
    fn missing_config_file_fails() {
        stressburst()
            .args(["run", "-f", "/nonexistent/burst.toml"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read config file"));
    }
}
