//! Integration tests for the Galleon CLI
//!
//! These tests run the actual binary and verify output. None of them needs
//! network access.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn galleon_cmd() -> Command {
    let mut cmd = Command::cargo_bin("galleon").unwrap();
    cmd.env_remove("GALLEON_LOG_LEVEL")
        .env_remove("GALLEON_BASE_URL");
    cmd
}

#[test]
fn test_help_flag() {
    galleon_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("declarative JSON-to-document binding"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("resolve"));
}

#[test]
fn test_render_help_lists_credential_flags() {
    galleon_cmd()
        .args(["render", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--local"))
        .stdout(predicate::str::contains("--base-url"));
}

// ============================================================================
// resolve
// ============================================================================

#[test]
fn test_resolve_nested_value() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("data.json");
    fs::write(&data, r#"{"items": [{"name": "first"}, {"name": "second"}]}"#).unwrap();

    galleon_cmd()
        .args(["resolve", data.to_str().unwrap(), "items[1].name"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"second\""));
}

#[test]
fn test_resolve_missing_prints_undefined() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("data.json");
    fs::write(&data, r#"{"a": 1}"#).unwrap();

    galleon_cmd()
        .args(["resolve", data.to_str().unwrap(), "a.b.c"])
        .assert()
        .success()
        .stdout(predicate::str::contains("undefined"));
}

#[test]
fn test_resolve_invalid_path_fails_with_fix() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("data.json");
    fs::write(&data, "{}").unwrap();

    galleon_cmd()
        .args(["resolve", data.to_str().unwrap(), "a..b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GL-010"))
        .stderr(predicate::str::contains("Fix:"));
}

#[test]
fn test_resolve_missing_file_fails() {
    galleon_cmd()
        .args(["resolve", "/nonexistent/data.json", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

// ============================================================================
// render
// ============================================================================

#[test]
fn test_render_static_document() {
    let temp_dir = TempDir::new().unwrap();
    let doc = temp_dir.path().join("page.yaml");
    fs::write(
        &doc,
        r#"
- tag: h1
  text: Hello & welcome
- tag: br
"#,
    )
    .unwrap();

    galleon_cmd()
        .args(["render", doc.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("<h1>Hello &amp; welcome</h1><br>"));
}

#[test]
fn test_render_unreachable_entry_keeps_markup() {
    let temp_dir = TempDir::new().unwrap();
    let doc = temp_dir.path().join("page.yaml");
    fs::write(
        &doc,
        r#"
- tag: p
  attrs: { data-gl-get: "http://127.0.0.1:9/api", data-gl-bind: name }
  text: Loading
"#,
    )
    .unwrap();

    galleon_cmd()
        .args(["render", doc.to_str().unwrap(), "--log-level", "none"])
        .assert()
        .success()
        .stdout(predicate::str::contains(">Loading</p>"))
        .stderr(predicate::str::contains("entry_failed"));
}

#[test]
fn test_render_rejects_unknown_log_level() {
    let temp_dir = TempDir::new().unwrap();
    let doc = temp_dir.path().join("page.yaml");
    fs::write(&doc, "[]").unwrap();

    galleon_cmd()
        .args(["render", doc.to_str().unwrap(), "--log-level", "loud"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GL-071"));
}

#[test]
fn test_render_with_explicit_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    fs::write(&config, "attribute_prefix = \"data-x\"\nlog_level = \"NONE\"\n").unwrap();
    let doc = temp_dir.path().join("page.json");
    fs::write(&doc, r#"[{"tag": "p", "attrs": {"data-x-get": ""}}]"#).unwrap();

    galleon_cmd()
        .args(["--config", config.to_str().unwrap()])
        .args(["render", doc.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("<p data-x-get></p>"))
        .stderr(predicate::str::contains("empty endpoint"));
}

#[test]
fn test_bad_credential_flag_is_rejected() {
    galleon_cmd()
        .args(["fetch", "http://127.0.0.1:9/", "--local", "novalue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected key=value"));
}

#[test]
fn test_fetch_with_only_invalid_auth_sources_fails_without_request() {
    galleon_cmd()
        .args(["fetch", "http://127.0.0.1:9/", "--auth", "cookie:token"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GL-030"))
        .stderr(predicate::str::contains("no credential was found"));
}
