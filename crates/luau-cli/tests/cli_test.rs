//! End-to-end runs of the `luau-analyze` binary

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use pretty_assertions::assert_eq;

fn luau_analyze(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_luau-analyze"))
        .current_dir(dir)
        .args(args)
        .env_remove("LUAU_LOG")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run luau-analyze")
}

fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, text) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }
    dir
}

#[test]
fn check_clean_project_succeeds() {
    let dir = project(&[
        ("src/util.luau", "return { value = 1 }"),
        ("src/main.luau", "local u = require('util')\nlocal n: number = u.value"),
    ]);
    let output = luau_analyze(dir.path(), &["check", "src", "--mode", "strict"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn check_reports_errors_and_fails() {
    let dir = project(&[("main.luau", "local x: number = 'hi'")]);
    let output = luau_analyze(dir.path(), &["check", "main.luau", "--mode", "strict"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("TypeMismatch"), "{}", stderr);
}

#[test]
fn check_json_output() {
    let dir = project(&[("main.luau", "local x: number = 'hi'")]);
    let output = luau_analyze(dir.path(), &["check", ".", "--mode", "strict", "--format", "json"]);
    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reports[0]["file"], "main.luau");
    assert_eq!(reports[0]["diagnostics"][0]["startCol"], 18);
    assert_eq!(reports[0]["diagnostics"][0]["severity"], "error");
}

#[test]
fn luaurc_sets_mode_and_flags_override() {
    let dir = project(&[
        (".luaurc", r#"{"languageMode": "nocheck"}"#),
        ("main.luau", "local x: number = 'hi'"),
    ]);
    let output = luau_analyze(dir.path(), &["check", "main.luau"]);
    assert!(output.status.success());

    let output = luau_analyze(dir.path(), &["check", "main.luau", "--mode", "strict"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn solver_iteration_budget_is_configurable() {
    let source = "local function add(a: number, b: number)\n    return a + b\nend\nlocal n: number = add(1, 2)";
    let dir = project(&[("main.luau", source)]);
    let output = luau_analyze(dir.path(), &["check", "main.luau", "--mode", "strict"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = luau_analyze(
        dir.path(),
        &["check", "main.luau", "--mode", "strict", "--max-solver-iterations", "0"],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("CodeTooComplex"));
}

#[test]
fn bad_config_is_a_usage_error() {
    let dir = project(&[(".luaurc", "{"), ("main.luau", "")]);
    let output = luau_analyze(dir.path(), &["check", "main.luau"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid config"));
}

#[test]
fn hover_prints_type() {
    let dir = project(&[("main.luau", "local n: number = 5")]);
    let output = luau_analyze(dir.path(), &["hover", "main.luau", "0", "6"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "```luau\nn: number\n```\n");
}

#[test]
fn complete_uses_other_modules() {
    let dir = project(&[
        ("util.luau", "return { f = function() end }"),
        ("main.luau", "local u = require('util')\nu."),
    ]);
    let output = luau_analyze(dir.path(), &["complete", "main.luau", "1", "2", "--module", "util.luau"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|line| line.starts_with("f\tfunction")), "{}", stdout);
}

#[test]
fn serve_answers_each_line() {
    let dir = tempfile::tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_luau-analyze"))
        .current_dir(dir.path())
        .arg("serve")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    {
        let stdin = child.stdin.as_mut().unwrap();
        writeln!(stdin, r#"{{"op":"setMode","mode":1}}"#).unwrap();
        writeln!(stdin, "garbage").unwrap();
        writeln!(stdin, r#"{{"op":"getDiagnostics","name":"main","text":"local x = 1"}}"#).unwrap();
    }
    drop(child.stdin.take());
    let output = child.wait_with_output().unwrap();
    let lines: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], serde_json::json!({"ok": true}));
    assert!(lines[1]["error"].is_string());
    assert_eq!(lines[2], serde_json::json!({"diagnostics": []}));
}
