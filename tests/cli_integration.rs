//! CLI Integration Tests
//!
//! These tests run the `mtree` binary end-to-end and check its JSON output.
//!
//! Run with:
//! ```bash
//! cargo test --test cli_integration
//! ```

use serde_json::Value;
use std::process::Command;

/// Run mtree with JSON output and return (parsed stdout, stderr, success)
fn run_mtree(args: &[&str]) -> (Value, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_mtree"))
        .args(["-f", "json"])
        .args(args)
        .output()
        .expect("Failed to execute mtree");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let json = serde_json::from_str(stdout.trim()).unwrap_or(Value::Null);
    (
        json,
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

// ============================================================================
// Hash Tests
// ============================================================================

#[test]
fn test_cli_hash_lists_entries_in_path_order() {
    let (json, stderr, success) = run_mtree(&[
        "hash",
        "streams.publishes.topic1.type=message-bus",
        "collector.threshold=145",
        "collector.listenPort=8080",
    ]);

    assert!(success, "hash should succeed: {}", stderr);
    assert_eq!(json["algorithm"], "blake3");
    assert_eq!(json["root"].as_str().unwrap().len(), 64);

    let paths: Vec<&str> = json["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["path"].as_str().unwrap())
        .collect();
    assert_eq!(
        paths,
        vec![
            "collector.listenPort",
            "collector.threshold",
            "streams.publishes.topic1.type"
        ]
    );
}

#[test]
fn test_cli_hash_ignores_assignment_order() {
    let (first, _, _) = run_mtree(&["hash", "a.b=1", "c=2"]);
    let (second, _, _) = run_mtree(&["hash", "c=2", "a.b=1"]);

    assert_eq!(first["root"], second["root"]);
}

#[test]
fn test_cli_digest_selection() {
    let (blake3, _, _) = run_mtree(&["hash", "a=1"]);
    let (sha256, stderr, success) = run_mtree(&["-d", "sha256", "hash", "a=1"]);

    assert!(success, "sha256 digest should be accepted: {}", stderr);
    assert_eq!(sha256["algorithm"], "sha256");
    assert_ne!(blake3["root"], sha256["root"]);
}

#[test]
fn test_cli_empty_tree_hash() {
    let (json, _, success) = run_mtree(&["hash"]);

    assert!(success);
    assert!(json["entries"].as_array().unwrap().is_empty());
    assert!(json["root"].is_string());
}

// ============================================================================
// Get Tests
// ============================================================================

#[test]
fn test_cli_get_value() {
    let (json, _, success) = run_mtree(&[
        "get",
        "--path",
        "collector.listenPort",
        "collector.listenPort=8080",
        "collector.threshold=145",
    ]);

    assert!(success);
    assert_eq!(json["value"], "8080");
    assert_eq!(json["entries"], 1);
}

#[test]
fn test_cli_get_branch_has_no_value() {
    let (json, _, success) = run_mtree(&[
        "get",
        "--path",
        "collector",
        "collector.listenPort=8080",
        "collector.threshold=145",
    ]);

    assert!(success);
    assert!(json["value"].is_null());
    assert_eq!(json["entries"], 2);
}

#[test]
fn test_cli_get_missing_path() {
    let (json, _, success) = run_mtree(&["get", "--path", "nope", "a=1"]);

    assert!(!success, "missing path should fail");
    assert_eq!(json["status"], "error");
    assert!(json["message"].as_str().unwrap().contains("Path not found"));
}

// ============================================================================
// Diff Tests
// ============================================================================

#[test]
fn test_cli_diff_reports_changes() {
    let (json, _, success) = run_mtree(&[
        "diff",
        "--old",
        "collector.threshold=145",
        "collector.listenPort=8080",
        "--new",
        "collector.threshold=1410",
        "collector.listenPort=8080",
        "streams.publishes.topic1.type=message-bus",
    ]);

    assert!(success);
    assert_eq!(json["root_changed"], true);
    assert_eq!(json["modified"], 1);
    assert_eq!(json["added"], 1);
    assert_eq!(json["removed"], 0);
}

#[test]
fn test_cli_diff_identical_trees() {
    let (json, _, success) = run_mtree(&["diff", "--old", "a=1", "--new", "a=1"]);

    assert!(success);
    assert_eq!(json["root_changed"], false);
    assert!(json["entries"].as_array().unwrap().is_empty());
    assert!(json["watch"].is_null());
}

/// Diff a fixed old tree against `new`, watching the `collector` subtree
fn watch_collector(new: &[&str]) -> Value {
    let mut args = vec!["diff", "--old", "collector.listenPort=8080", "other=1", "--new"];
    args.extend_from_slice(new);
    args.extend_from_slice(&["--watch", "collector"]);
    run_mtree(&args).0
}

#[test]
fn test_cli_diff_watch_statuses() {
    let json = watch_collector(&["collector.listenPort=8080", "other=2"]);
    assert_eq!(json["watch"]["status"], "unchanged");
    assert!(json["watch"]["hash"].is_string());

    let json = watch_collector(&["collector.listenPort=9090"]);
    assert_eq!(json["watch"]["status"], "changed");
    assert!(json["watch"]["hash"].is_string());

    let json = watch_collector(&["other=1"]);
    assert_eq!(json["watch"]["status"], "removed");
    assert!(json["watch"]["hash"].is_null());
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[test]
fn test_cli_invalid_assignment() {
    let (json, _, success) = run_mtree(&["hash", "no-equals-sign"]);

    assert!(!success);
    assert_eq!(json["status"], "error");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("Invalid assignment"));
}

#[test]
fn test_cli_empty_path_rejected() {
    let (json, _, success) = run_mtree(&["hash", "=value"]);

    assert!(!success);
    assert_eq!(json["status"], "error");
}

#[test]
fn test_cli_unicode_values() {
    let (json, _, success) = run_mtree(&["get", "--path", "greeting", "greeting=héllo wörld"]);

    assert!(success);
    assert_eq!(json["value"], "héllo wörld");
}
