//! Smoke tests for the `mcp-runtime` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

const INITIALIZE: &str = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"cli-test","version":"0.0.1"}}}"#;

#[test]
fn answers_initialize_on_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.yaml");
    fs::write(&config, "host:\n  name: smoke-server\n").unwrap();

    let output = Command::cargo_bin("mcp-runtime")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("--log-level")
        .arg("debug")
        .write_stdin(format!("{}\n", INITIALIZE))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    // Logs go to stderr, so every stdout line is protocol.
    let stdout = String::from_utf8(output).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(lines[0]["result"]["serverInfo"]["name"], "smoke-server");
}

#[test]
fn rejects_unsupported_transport() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.yaml");
    fs::write(&config, "server:\n  type: websocket\n").unwrap();

    Command::cargo_bin("mcp-runtime")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("websocket"));
}

#[test]
fn log_file_receives_logs() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("runtime.log");

    Command::cargo_bin("mcp-runtime")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("absent.yaml"))
        .arg("--log-file")
        .arg(&log)
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = fs::read_to_string(&log).unwrap();
    assert!(written.contains("Starting MCP runtime"));
}

#[test]
fn help_lists_config_search_order() {
    let output = Command::cargo_bin("mcp-runtime")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let help = String::from_utf8(output).unwrap();

    let order = [
        "./config.yaml",
        "MCP_RUNTIME_CONFIG_PATH",
        "root",
        "mcp-runtime/config.yaml",
    ];
    let positions: Vec<usize> = order
        .iter()
        .map(|needle| help.find(needle).unwrap_or_else(|| panic!("{} missing from help", needle)))
        .collect();
    assert!(
        positions.windows(2).all(|w| w[0] < w[1]),
        "search order in help does not match: {}",
        help
    );
}
