//! CLI integration tests.
//!
//! Uses `assert_cmd` to spawn the `arbiter` binary against the offline
//! provider and a ledger in a temp directory. Each command runs with the
//! temp directory as working directory so no stray `arbiter.toml` is read.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// `arbiter` rooted in `dir`, offline provider, ledger inside `dir`.
fn arbiter(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("arbiter");
    cmd.current_dir(dir.path())
        .env("ARBITER_PROVIDER", "offline")
        .env("ARBITER_LEDGER", dir.path().join("audit.jsonl"))
        .env_remove("RUST_LOG");
    cmd
}

fn ledger_lines(dir: &TempDir) -> Vec<serde_json::Value> {
    std::fs::read_to_string(dir.path().join("audit.jsonl"))
        .unwrap_or_default()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

// ──────────────────────────────────────────────
// Help
// ──────────────────────────────────────────────

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().unwrap();
    arbiter(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("evaluate"))
        .stdout(predicate::str::contains("audit"));
}

#[test]
fn unknown_command_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    arbiter(&dir).arg("frobnicate").assert().failure();
}

// ──────────────────────────────────────────────
// Evaluate
// ──────────────────────────────────────────────

#[test]
fn evaluate_valid_record_completes() {
    let dir = TempDir::new().unwrap();
    arbiter(&dir)
        .arg("evaluate")
        .arg(fixture("valid_record.json"))
        .assert()
        .code(0)
        .stdout(predicate::str::contains("status:          completed"))
        .stdout(predicate::str::contains("recommendation:  MONITOR (synthesis)"));

    let lines = ledger_lines(&dir);
    assert_eq!(lines.len(), 6, "4 steps, 1 escalation, 1 closing entry");
    let last = lines.last().unwrap();
    assert_eq!(last["actor"], "orchestrator");
    assert_eq!(last["action"], "evaluate_contract");
    assert!(last["input_hash"].as_str().unwrap().starts_with("sha256:"));
}

#[test]
fn evaluate_json_output_is_the_run() {
    let dir = TempDir::new().unwrap();
    let out = arbiter(&dir)
        .args(["--output", "json", "evaluate"])
        .arg(fixture("valid_record.json"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0));
    let run: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(run["record_id"], "CNT-2024-001");
    assert_eq!(run["status"], "completed");
    assert_eq!(run["steps"].as_array().unwrap().len(), 4);
    assert_eq!(run["decision"]["confidence_level"], "LOW");
}

#[test]
fn evaluate_invalid_record_fails_with_exit_2() {
    let dir = TempDir::new().unwrap();
    arbiter(&dir)
        .arg("evaluate")
        .arg(fixture("invalid_record.json"))
        .assert()
        .code(2)
        .stdout(predicate::str::contains("status:          failed"));

    let lines = ledger_lines(&dir);
    assert!(!lines.is_empty());
    assert_eq!(lines.last().unwrap()["confidence"], 0.5);
}

#[test]
fn evaluate_missing_file_exits_1() {
    let dir = TempDir::new().unwrap();
    arbiter(&dir)
        .args(["evaluate", "no-such-record.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error reading"));
}

#[test]
fn evaluate_unwritable_ledger_exits_1() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    arbiter(&dir)
        .env("ARBITER_LEDGER", blocker.join("audit.jsonl"))
        .arg("evaluate")
        .arg(fixture("valid_record.json"))
        .assert()
        .code(1);
}

#[test]
fn explicit_config_sets_ledger_path() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.toml");
    std::fs::write(
        &config,
        "[ledger]\npath = \"trail/ledger.jsonl\"\n\n[provider]\nkind = \"offline\"\n",
    )
    .unwrap();
    let mut cmd = cargo_bin_cmd!("arbiter");
    cmd.current_dir(dir.path())
        .env_remove("ARBITER_LEDGER")
        .env_remove("ARBITER_PROVIDER")
        .arg("--config")
        .arg(&config)
        .arg("evaluate")
        .arg(fixture("valid_record.json"))
        .assert()
        .code(0);
    assert!(dir.path().join("trail/ledger.jsonl").exists());
}

#[test]
fn malformed_config_exits_1() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("arbiter.toml"), "[provider\nkind = 3").unwrap();
    arbiter(&dir)
        .arg("audit")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("could not parse config"));
}

// ──────────────────────────────────────────────
// Audit
// ──────────────────────────────────────────────

#[test]
fn audit_filters_and_orders_entries() {
    let dir = TempDir::new().unwrap();
    for _ in 0..2 {
        arbiter(&dir)
            .arg("evaluate")
            .arg(fixture("valid_record.json"))
            .assert()
            .success();
    }

    let out = arbiter(&dir)
        .args(["--output", "json", "audit", "--actor", "orchestrator"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let entries: Vec<serde_json::Value> = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(entries.len(), 2);

    let out = arbiter(&dir)
        .args(["--output", "json", "audit", "--limit", "3", "--newest-first"])
        .output()
        .unwrap();
    let entries: Vec<serde_json::Value> = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["action"], "evaluate_contract");
}

#[test]
fn audit_on_empty_ledger_prints_zero_entries() {
    let dir = TempDir::new().unwrap();
    arbiter(&dir)
        .arg("audit")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 entries"));
}

// ──────────────────────────────────────────────
// Recover
// ──────────────────────────────────────────────

#[test]
fn recover_repairs_truncated_reply() {
    let dir = TempDir::new().unwrap();
    arbiter(&dir)
        .arg("recover")
        .arg(fixture("truncated_reply.txt"))
        .assert()
        .success()
        .stdout(predicate::str::contains("recommendation:  RENEW"))
        .stdout(predicate::str::contains("confidence:      HIGH"))
        .stdout(predicate::str::contains("recovery:        Repaired"));
}

#[test]
fn recover_reads_stdin() {
    let dir = TempDir::new().unwrap();
    let out = arbiter(&dir)
        .args(["--output", "json", "recover", "-"])
        .write_stdin("The vendor repeatedly missed SLAs; I recommend we terminate.")
        .output()
        .unwrap();
    assert!(out.status.success());
    let decision: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(decision["recommendation"], "TERMINATE");
    assert_eq!(decision["confidence_level"], "LOW");
}

#[test]
fn recover_accepts_invalid_utf8_on_stdin() {
    let dir = TempDir::new().unwrap();
    let mut reply = b"Vendor data \xff\xfe garbled; I recommend we terminate.".to_vec();
    reply.extend_from_slice(b" \xc3");
    let out = arbiter(&dir)
        .args(["--output", "json", "recover", "-"])
        .write_stdin(reply)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let decision: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(decision["recommendation"], "TERMINATE");
    assert_eq!(decision["recovery"], "heuristic");
}

#[test]
fn recover_accepts_invalid_utf8_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reply.txt");
    let mut bytes = b"```json\n{\"recommendation\": \"RENEW\", ".to_vec();
    bytes.extend_from_slice(b"\"confidence_level\": \"HIGH\", ");
    bytes.extend_from_slice(b"\"justification\": \"caf\xe9 vendor\"}\n```");
    std::fs::write(&path, bytes).unwrap();
    arbiter(&dir)
        .arg("recover")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("recommendation:  RENEW"))
        .stdout(predicate::str::contains("recovery:        Parsed"));
}

// ──────────────────────────────────────────────
// Validate and health
// ──────────────────────────────────────────────

#[test]
fn validate_reports_errors_and_exit_codes() {
    let dir = TempDir::new().unwrap();
    arbiter(&dir)
        .arg("validate")
        .arg(fixture("valid_record.json"))
        .assert()
        .code(0)
        .stdout(predicate::str::contains("valid (completeness 100%)"));

    arbiter(&dir)
        .arg("validate")
        .arg(fixture("invalid_record.json"))
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Missing required fields"));
}

#[test]
fn health_of_offline_provider() {
    let dir = TempDir::new().unwrap();
    arbiter(&dir)
        .arg("health")
        .assert()
        .success()
        .stdout(predicate::str::contains("offline"))
        .stdout(predicate::str::contains("healthy"));
}

#[test]
fn health_without_api_key_exits_1() {
    let dir = TempDir::new().unwrap();
    arbiter(&dir)
        .env("ARBITER_PROVIDER", "gemini")
        .env_remove("GEMINI_API_KEY")
        .arg("health")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}
