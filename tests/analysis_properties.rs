//! Session-level properties of the analysis frontend

mod support;

use luau_playground::ast::{Position, Range};
use luau_playground::checker::{Mode, Severity, SolverKind};
use luau_playground::frontend::CompletionKind;
use luau_playground::AnalysisSession;
use pretty_assertions::assert_eq;

use support::{codes, session_with};

#[test]
fn diagnostics_are_idempotent() {
    let sources = [
        "local x: number = 'hi'",
        "local a, b = 1\nlocal t = { k = 1, k = 2 }",
        "local function f(x) return x + 1 end\nf('s')",
        "local = 2",
        "print(undefinedGlobal)",
    ];
    for mode in [Mode::Strict, Mode::Nonstrict] {
        for source in sources {
            let mut session = session_with(&[("main", source)]);
            session.set_mode(mode);
            let first = session.diagnostics("main");
            let second = session.diagnostics("main");
            assert_eq!(first, second, "{}: {}", mode, source);
        }
    }
}

#[test]
fn mode_change_reruns_inference() {
    let mut session = session_with(&[("main", "local function f(x) return x + 1 end\nf('s')")]);
    assert!(codes(&mut session, "main").is_empty());

    session.set_mode(Mode::Strict);
    assert_eq!(codes(&mut session, "main"), vec!["TypeMismatch"]);

    session.set_mode(Mode::Nonstrict);
    assert!(codes(&mut session, "main").is_empty());
}

#[test]
fn relative_require_resolves_to_nested_module() {
    let mut session = session_with(&[
        ("a", "local b = require('./b')\nlocal n: number = b.size\nreturn {}"),
        ("a/b.luau", "return { size = 1 }"),
    ]);
    session.set_mode(Mode::Strict);
    assert!(codes(&mut session, "a").is_empty());

    session.set_source("a/b.luau", "return { size = 'big' }");
    assert_eq!(codes(&mut session, "a"), vec!["TypeMismatch"]);
}

#[test]
fn unresolved_require_is_one_diagnostic_at_call() {
    let mut session = session_with(&[("main", "local m = require('nowhere')")]);
    let diagnostics = session.diagnostics("main");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, "UnknownRequire");
    assert_eq!(
        diagnostics[0].range,
        Range::new(Position::new(0, 10), Position::new(0, 28))
    );
}

#[test]
fn broken_dependency_is_isolated() {
    let mut session = session_with(&[
        ("util", "local function (\nreturn {}"),
        ("main", "local u = require('util')\nlocal y = u.value\nlocal z: number = 'z'"),
    ]);
    session.set_mode(Mode::Strict);
    let util = codes(&mut session, "util");
    assert!(!util.is_empty());
    assert!(util.iter().all(|code| code == "SyntaxError"));

    let main = codes(&mut session, "main");
    assert_eq!(main, vec!["TypeMismatch"]);
}

#[test]
fn scenario_a_strict_mismatch_spans_literal() {
    let mut session = AnalysisSession::new();
    session.set_source("main", "local x: number = 'hi'");
    session.set_mode(Mode::Strict);
    let diagnostics = session.diagnostics("main");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!(
        diagnostics[0].range,
        Range::new(Position::new(0, 18), Position::new(0, 22))
    );
}

#[test]
fn scenario_b_nocheck_is_silent() {
    let mut session = AnalysisSession::new();
    session.set_source("main", "local x = 1");
    session.set_mode(Mode::NoCheck);
    assert!(session.diagnostics("main").is_empty());
}

#[test]
fn scenario_c_member_completion_across_modules() {
    let mut session = AnalysisSession::new();
    session.set_source("util", "return {f=function() end}");
    session.set_source("main", "local u = require('util')\nu.");
    let items = session.autocomplete("main", Position::new(1, 2));
    let f = items.iter().find(|item| item.label == "f").expect("completion for f");
    assert_eq!(f.kind, CompletionKind::Function);
}

#[test]
fn scenario_d_hover_shows_annotation() {
    let mut session = AnalysisSession::new();
    session.set_source("main", "local n: number = 5");
    let content = session.hover("main", Position::new(0, 6)).expect("hover content");
    assert!(content.contains("number"), "{}", content);
}

#[test]
fn scenario_e_solver_toggle_matches_fresh_session() {
    let source = "local t = {}\nt.x = 1\nlocal function id(v) return v end\nlocal s: string = id(5)";
    let mut session = session_with(&[("main", source)]);
    session.set_mode(Mode::Strict);
    session.diagnostics("main");

    session.set_solver(SolverKind::Old);
    let old = session.diagnostics("main");
    session.set_solver(SolverKind::New);
    let new = session.diagnostics("main");

    for (solver, seen) in [(SolverKind::Old, old), (SolverKind::New, new)] {
        let mut fresh = session_with(&[("main", source)]);
        fresh.set_mode(Mode::Strict);
        fresh.set_solver(solver);
        assert_eq!(seen, fresh.diagnostics("main"), "{} solver", solver);
    }
}

#[test]
fn queries_on_unknown_modules_are_empty() {
    let mut session = AnalysisSession::new();
    assert!(session.diagnostics("ghost").is_empty());
    assert!(session.autocomplete("ghost", Position::new(0, 0)).is_empty());
    assert_eq!(session.hover("ghost", Position::new(3, 3)), None);
    assert_eq!(session.signature_help("ghost", Position::new(0, 0)), None);
}

#[test]
fn out_of_range_positions_are_empty() {
    let mut session = session_with(&[("main", "local n = 1\nlocal m = 2")]);
    assert_eq!(session.hover("main", Position::new(7, 0)), None);
    assert!(session.autocomplete("main", Position::new(7, 0)).is_empty());
    assert_eq!(session.hover("main", Position::new(0, 99)), None);
    assert!(session.autocomplete("main", Position::new(0, 99)).is_empty());
    assert_eq!(session.signature_help("main", Position::new(1, 12)), None);
    assert!(session.hover("main", Position::new(0, 6)).is_some());
}

#[test]
fn deeply_nested_code_is_a_syntax_error() {
    let nested = format!("local x = {}1{}\nlocal y: number = 'y'", "(".repeat(300), ")".repeat(300));
    let tables = format!("local t = {}{}", "{".repeat(300), "}".repeat(300));
    for solver in [SolverKind::New, SolverKind::Old] {
        let mut session = session_with(&[("main", nested.as_str()), ("tables", tables.as_str())]);
        session.set_mode(Mode::Strict);
        session.set_solver(solver);
        assert_eq!(codes(&mut session, "main"), vec!["SyntaxError", "TypeMismatch"]);
        assert_eq!(codes(&mut session, "tables"), vec!["SyntaxError"]);
    }
}

#[test]
fn reset_clears_modules() {
    let mut session = session_with(&[("main", "local x = 1"), ("util", "return 1")]);
    assert_eq!(session.modules(), vec!["util"]);
    session.reset();
    assert!(session.modules().is_empty());
    assert!(session.get_source("main").is_err());
}
