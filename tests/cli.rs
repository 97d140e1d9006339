//! Integration tests for CLI commands

#![allow(deprecated)]

use assert_cmd::{assert::OutputAssertExt, cargo::CommandCargoExt};
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Write a config that keeps the snapshot inside `tmp`
fn write_config(tmp: &Path) -> PathBuf {
    let config = tmp.join("config.toml");
    let slot = tmp.join("llm-comparison-storage.json");
    std::fs::write(
        &config,
        format!(
            "[upstream]\nchat_url = \"http://127.0.0.1:9/chat\"\nmodels_url = \"http://127.0.0.1:9/models\"\nrequest_timeout_secs = 2\n\n[storage]\npath = {:?}\n",
            slot.display().to_string()
        ),
    )
    .unwrap();
    config
}

fn panelcmp(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("panelcmp").unwrap();
    cmd.env_remove("OPENROUTER_API_KEY")
        .env("NO_COLOR", "1")
        .arg("--config")
        .arg(config);
    cmd
}

fn snapshot(tmp: &Path) -> serde_json::Value {
    let raw = std::fs::read_to_string(tmp.join("llm-comparison-storage.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn test_main_command_help() {
    let mut cmd = Command::cargo_bin("panelcmp").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Compare LLM replies side by side"))
        .stdout(predicate::str::contains("send"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_send_command_help() {
    let mut cmd = Command::cargo_bin("panelcmp").unwrap();
    cmd.arg("send").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("every active panel"));
}

#[test]
fn test_fresh_workspace_lists_one_panel() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    panelcmp(&config)
        .arg("panels")
        .assert()
        .success()
        .stdout(predicate::str::contains("(no model)"));
}

#[test]
fn test_add_with_model_is_persisted() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    panelcmp(&config)
        .args(["add", "--model", "openai/gpt-4o"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added panel-"));

    let json = snapshot(tmp.path());
    let panels = json["panels"].as_array().unwrap();
    assert_eq!(panels.len(), 2);
    assert_eq!(panels[1]["modelId"], "openai/gpt-4o");

    panelcmp(&config)
        .arg("panels")
        .assert()
        .success()
        .stdout(predicate::str::contains("openai/gpt-4o"));
}

#[test]
fn test_pin_moves_panel_first() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    panelcmp(&config)
        .args(["add", "--model", "m/second"])
        .assert()
        .success();
    panelcmp(&config)
        .args(["pin", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pinned"));

    let json = snapshot(tmp.path());
    assert_eq!(json["panels"][1]["isPinned"], true);

    // position 1 is now the pinned panel
    panelcmp(&config)
        .args(["model", "1", "m/renamed"])
        .assert()
        .success();
    let json = snapshot(tmp.path());
    assert_eq!(json["panels"][1]["modelId"], "m/renamed");
}

#[test]
fn test_prompt_is_stored_and_key_is_not() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    panelcmp(&config)
        .args(["--api-key", "sk-or-secret", "prompt", "Be terse."])
        .assert()
        .success();

    let raw = std::fs::read_to_string(tmp.path().join("llm-comparison-storage.json")).unwrap();
    assert!(raw.contains("Be terse."));
    assert!(!raw.contains("sk-or-secret"));
}

#[test]
fn test_remove_unknown_panel_fails() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    panelcmp(&config)
        .args(["remove", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No panel at position 7"));
}

#[test]
fn test_reorder_requires_every_panel() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());
    panelcmp(&config).arg("add").assert().success();

    panelcmp(&config)
        .args(["reorder", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Reorder needs every panel"));

    let before = snapshot(tmp.path());
    panelcmp(&config).args(["reorder", "2", "1"]).assert().success();
    let after = snapshot(tmp.path());
    assert_eq!(after["panels"][0]["id"], before["panels"][1]["id"]);
    assert_eq!(after["panels"][1]["id"], before["panels"][0]["id"]);
}

#[test]
fn test_send_without_key_fails() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    panelcmp(&config)
        .args(["send", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key"));
}

#[test]
fn test_send_without_assigned_model_fails() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    panelcmp(&config)
        .args(["--api-key", "k", "send", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No active panel has a model"));
}

#[test]
fn test_send_records_unreachable_upstream_on_panel() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());
    panelcmp(&config).args(["model", "1", "m/one"]).assert().success();

    panelcmp(&config)
        .args(["--api-key", "k", "send", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 sent, 0 answered, 1 failed"));

    // the user turn is kept; the error is not persisted
    let json = snapshot(tmp.path());
    let history = json["panels"][0]["conversationHistory"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["content"], "hello");
    assert!(json["panels"][0]["error"].is_null());
}

#[test]
fn test_config_init_writes_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("fresh.toml");

    panelcmp(&config)
        .args(["config", "--init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));
    assert!(std::fs::read_to_string(&config)
        .unwrap()
        .contains("request_timeout_secs = 120"));

    panelcmp(&config)
        .args(["config", "--init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_shows_effective_values() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    panelcmp(&config)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("request_timeout_secs = 2"));
}

#[test]
fn test_missing_config_file_fails() {
    let tmp = TempDir::new().unwrap();

    panelcmp(&tmp.path().join("nope.toml"))
        .arg("panels")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
