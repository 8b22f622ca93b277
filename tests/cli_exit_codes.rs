//! Process-boundary tests for the two job binaries
//!
//! Spawn the built executables and check the contract the host relies on:
//! one JSON document on stdout, exit zero whenever the requested mode ran
//! to completion, non-zero only for invocation-level failures.

use std::process::{Command, Output};
use tempfile::TempDir;

fn bgremove() -> Command {
    Command::new(env!("CARGO_BIN_EXE_imgjobs-bgremove"))
}

fn moderate() -> Command {
    Command::new(env!("CARGO_BIN_EXE_imgjobs-moderate"))
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}):\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

#[test]
fn test_no_args_prints_usage_and_exits_clean() {
    let output = bgremove().output().expect("failed to run imgjobs-bgremove");
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage"));

    let output = moderate().output().expect("failed to run imgjobs-moderate");
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage"));
}

#[test]
fn test_single_item_failure_is_data_not_exit_code() {
    let temp = TempDir::new().unwrap();
    let output = bgremove()
        .arg(temp.path().join("missing.png"))
        .env("TMPDIR", temp.path())
        .output()
        .expect("failed to run imgjobs-bgremove");

    assert_eq!(output.status.code(), Some(0));
    let value = stdout_json(&output);
    assert_eq!(value["success"], serde_json::json!(false));
    assert!(value["error"].as_str().unwrap().contains("unavailable"));

    // and the failed item left no kept temp file behind
    let leftovers = std::fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("imgjobs_"))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn test_moderate_single_item_failure_exits_clean() {
    let output = moderate()
        .arg("/nonexistent/photo.png")
        .output()
        .expect("failed to run imgjobs-moderate");

    assert_eq!(output.status.code(), Some(0));
    let value = stdout_json(&output);
    assert_eq!(value["is_nsfw"], serde_json::json!(false));
    assert!(value["confidence"].as_f64().unwrap().abs() < 1e-9);
    assert!(!value["error"].is_null());
}

#[test]
fn test_batch_with_failed_items_exits_clean() {
    let temp = TempDir::new().unwrap();
    let request_file = temp.path().join("batch.json");
    std::fs::write(
        &request_file,
        serde_json::json!({
            "image_paths": [
                temp.path().join("a.png").display().to_string(),
                temp.path().join("b.png").display().to_string(),
            ],
            "requests": [{ "user_id": "u1" }, {}],
            "output_path": temp.path().join("processed").display().to_string(),
        })
        .to_string(),
    )
    .unwrap();

    let output = bgremove()
        .arg("--batch")
        .arg(&request_file)
        .output()
        .expect("failed to run imgjobs-bgremove");

    assert_eq!(output.status.code(), Some(0));
    let value = stdout_json(&output);
    let records = value.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["success"], serde_json::json!(false));
    assert_eq!(records[0]["user_id"], serde_json::json!("u1"));
    assert_eq!(records[1]["user_id"], serde_json::json!("unknown"));
}

#[test]
fn test_unreadable_batch_file_is_invocation_failure() {
    let output = bgremove()
        .arg("--batch")
        .arg("/nonexistent/batch.json")
        .output()
        .expect("failed to run imgjobs-bgremove");

    assert_eq!(output.status.code(), Some(1));
    let value = stdout_json(&output);
    assert_eq!(value["success"], serde_json::json!(false));
    assert!(value["error"]
        .as_str()
        .unwrap()
        .contains("Cannot read batch file"));
}

#[test]
fn test_batch_length_mismatch_is_invocation_failure() {
    let temp = TempDir::new().unwrap();
    let request_file = temp.path().join("mismatch.json");
    std::fs::write(
        &request_file,
        r#"{ "image_paths": ["a.png", "b.png"], "requests": [{ "user_id": "u1" }] }"#,
    )
    .unwrap();

    let output = bgremove()
        .arg("--batch")
        .arg(&request_file)
        .output()
        .expect("failed to run imgjobs-bgremove");

    assert_eq!(output.status.code(), Some(1));
    let value = stdout_json(&output);
    assert_eq!(value["success"], serde_json::json!(false));
    assert!(value["error"].as_str().unwrap().contains("must be parallel"));
}

#[test]
fn test_moderate_batch_mismatch_is_invocation_failure() {
    let temp = TempDir::new().unwrap();
    let request_file = temp.path().join("mismatch.json");
    std::fs::write(
        &request_file,
        r#"{ "image_paths": ["a.png", "b.png"], "user_ids": ["u1"] }"#,
    )
    .unwrap();

    let output = moderate()
        .arg("--batch")
        .arg(&request_file)
        .output()
        .expect("failed to run imgjobs-moderate");

    assert_eq!(output.status.code(), Some(1));
    let value = stdout_json(&output);
    assert_eq!(value["is_nsfw"], serde_json::json!(false));
    assert!(!value["error"].is_null());
}

#[test]
fn test_info_mode_reports_capability_state() {
    let output = bgremove()
        .arg("--info")
        .output()
        .expect("failed to run imgjobs-bgremove");

    assert_eq!(output.status.code(), Some(0));
    let value = stdout_json(&output);
    assert_eq!(value["is_available"], serde_json::json!(false));
    assert_eq!(value["default_model"], serde_json::json!("u2net"));
    assert!(!value["error"].is_null());
}

#[test]
fn test_conflicting_modes_exit_with_usage_error() {
    let output = bgremove()
        .args(["--batch", "req.json", "--info"])
        .output()
        .expect("failed to run imgjobs-bgremove");
    assert_eq!(output.status.code(), Some(2));
}
