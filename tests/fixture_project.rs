//! A small multi-file project checked end to end

mod support;

use luau_playground::ast::Position;
use luau_playground::checker::Mode;
use pretty_assertions::assert_eq;

use support::{load_fixture, session_with};

fn inventory() -> luau_playground::AnalysisSession {
    let modules = load_fixture("inventory");
    let pairs: Vec<(&str, &str)> = modules.iter().map(|(n, s)| (n.as_str(), s.as_str())).collect();
    session_with(&pairs)
}

#[test]
fn fixture_modules_are_named_by_path() {
    let names: Vec<String> = load_fixture("inventory").into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["items", "main", "util/format"]);
}

#[test]
fn fixture_checks_cleanly() {
    for mode in [Mode::Nonstrict, Mode::Strict] {
        let mut session = inventory();
        session.set_mode(mode);
        for module in ["items", "util/format", "main"] {
            let diagnostics = session.diagnostics(module);
            assert!(
                diagnostics.iter().all(|d| !d.is_error()),
                "{} in {} mode: {:?}",
                module,
                mode,
                diagnostics
            );
        }
    }
}

#[test]
fn fixture_hover_and_completion() {
    let mut session = inventory();
    assert_eq!(
        session.hover("main", Position::new(6, 6)).as_deref(),
        Some("```luau\ntotal: number\n```")
    );

    let source = format!("{}Items.", session.get_source("main").unwrap());
    session.set_source("main", &source);
    let line = source.lines().count() as u32 - 1;
    let labels: Vec<String> = session
        .autocomplete("main", Position::new(line, 6))
        .into_iter()
        .map(|item| item.label)
        .collect();
    assert_eq!(labels, vec!["combined", "new"]);
}

#[test]
fn fixture_signature_help() {
    let mut session = inventory();
    let source = format!("{}Items.combined(apple, ", session.get_source("main").unwrap());
    session.set_source("main", &source);
    let line = source.lines().count() as u32 - 1;
    let col = source.lines().last().unwrap().len() as u32;
    let help = session.signature_help("main", Position::new(line, col)).expect("signature");
    assert_eq!(help.parameters, vec!["a: Item", "b: Item"]);
    assert_eq!(help.active_parameter, 1);
}
