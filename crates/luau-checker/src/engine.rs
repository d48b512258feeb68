//! Checking one module: parse, infer, lint
//!
//! The pipeline stops after parsing when the module has syntax errors, and
//! after parsing when the effective mode is NoCheck. Autocomplete uses a
//! separate entry point that keeps going on a recovered tree.

use luau_ast::{Chunk, LineIndex};
use luau_parser::{parse, ParseResult};

use crate::ctx::SolveConfig;
use crate::diagnostics::{sort_diagnostics, Diagnostic};
use crate::graph::{ModuleImports, TypeGraph};
use crate::lint::run_lints;
use crate::options::{CheckOptions, Mode};
use crate::requires::{find_requires, RequireRef};
use crate::solver::solver_for;

/// Everything produced by checking one module
#[derive(Debug, Clone)]
pub struct ModuleCheck {
    pub chunk: Chunk,
    pub lines: LineIndex,
    pub graph: TypeGraph,
    pub diagnostics: Vec<Diagnostic>,
    /// Mode actually used, after hot comments
    pub mode: Mode,
    pub requires: Vec<RequireRef>,
}

impl ModuleCheck {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// The mode a module is checked in: its hot comment if it has one,
/// otherwise the session mode
pub fn effective_mode(chunk: &Chunk, session: Mode) -> Mode {
    chunk
        .hot_comments
        .iter()
        .find_map(|c| match c.name.as_str() {
            "strict" => Some(Mode::Strict),
            "nonstrict" => Some(Mode::Nonstrict),
            "nocheck" => Some(Mode::NoCheck),
            _ => None,
        })
        .unwrap_or(session)
}

/// Check a module for diagnostics
pub fn check_module(source: &str, options: &CheckOptions, imports: &dyn ModuleImports) -> ModuleCheck {
    let ParseResult { chunk, errors } = parse(source);
    let lines = LineIndex::new(source);
    let mode = effective_mode(&chunk, options.mode);
    let requires = find_requires(&chunk);

    let mut diagnostics: Vec<Diagnostic> = errors
        .iter()
        .map(|e| Diagnostic::from_parse_error(e, &lines))
        .collect();

    let graph = if !errors.is_empty() {
        tracing::debug!(errors = errors.len(), "syntax errors, skipping inference");
        TypeGraph {
            parse_failed: true,
            ..TypeGraph::default()
        }
    } else if mode == Mode::NoCheck {
        TypeGraph::default()
    } else {
        let solver = solver_for(options.solver);
        let _span = tracing::debug_span!("infer", solver = solver.name(), mode = %mode).entered();
        let config = SolveConfig { mode, limits: options.limits, imports };
        let (graph, type_errors) = solver.check(&chunk, &config);
        tracing::debug!(errors = type_errors.len(), "inference finished");
        diagnostics.extend(type_errors.iter().map(|e| Diagnostic::from_type_error(e, &lines)));

        if options.lint && !chunk.has_hot_comment("nolint") {
            let warnings = run_lints(&chunk, source, &lines);
            diagnostics.extend(warnings.iter().map(|w| Diagnostic::from_lint(w, &lines)));
        }
        graph
    };

    sort_diagnostics(&mut diagnostics);
    ModuleCheck { chunk, lines, graph, diagnostics, mode, requires }
}

/// Check a module for editor queries
///
/// Inference always runs in Strict mode and runs on the recovered tree even
/// when the source has syntax errors, so the line being typed still gets
/// types. No lints run.
pub fn check_for_autocomplete(source: &str, options: &CheckOptions, imports: &dyn ModuleImports) -> ModuleCheck {
    let ParseResult { chunk, errors } = parse(source);
    let lines = LineIndex::new(source);
    let requires = find_requires(&chunk);

    let solver = solver_for(options.solver);
    let _span = tracing::debug_span!("infer_autocomplete", solver = solver.name()).entered();
    let config = SolveConfig { mode: Mode::Strict, limits: options.limits, imports };
    let (mut graph, type_errors) = solver.check(&chunk, &config);
    graph.parse_failed = !errors.is_empty();

    let mut diagnostics: Vec<Diagnostic> = errors
        .iter()
        .map(|e| Diagnostic::from_parse_error(e, &lines))
        .chain(type_errors.iter().map(|e| Diagnostic::from_type_error(e, &lines)))
        .collect();
    sort_diagnostics(&mut diagnostics);

    ModuleCheck { chunk, lines, graph, diagnostics, mode: Mode::Strict, requires }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::graph::NoImports;
    use crate::options::SolverKind;
    use luau_ast::Position;
    use pretty_assertions::assert_eq;

    fn options(mode: Mode) -> CheckOptions {
        CheckOptions { mode, ..CheckOptions::default() }
    }

    #[test]
    fn test_strict_mismatch_range() {
        let check = check_module("local x: number = 'hi'", &options(Mode::Strict), &NoImports);
        assert_eq!(check.diagnostics.len(), 1);
        let diag = &check.diagnostics[0];
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.code, "TypeMismatch");
        assert_eq!(diag.range.start, Position::new(0, 18));
        assert_eq!(diag.range.end, Position::new(0, 22));
    }

    #[test]
    fn test_nocheck_reports_nothing() {
        let check = check_module("local x = 1\nlocal y: number = 'no'", &options(Mode::NoCheck), &NoImports);
        assert!(check.diagnostics.is_empty());
        assert!(check.graph.expr_types.is_empty());
    }

    #[test]
    fn test_hot_comment_overrides_mode() {
        let source = "--!strict\nlocal function f(x) return x + 1 end\nf('s')";
        let check = check_module(source, &options(Mode::Nonstrict), &NoImports);
        assert_eq!(check.mode, Mode::Strict);
        assert_eq!(check.diagnostics.len(), 1);

        let check = check_module("--!nocheck\nlocal y: number = 'no'", &options(Mode::Strict), &NoImports);
        assert!(check.diagnostics.is_empty());
    }

    #[test]
    fn test_nolint() {
        let source = "local a, b = 1";
        assert_eq!(check_module(source, &options(Mode::Nonstrict), &NoImports).diagnostics.len(), 1);
        let silenced = format!("--!nolint\n{}", source);
        assert!(check_module(&silenced, &options(Mode::Nonstrict), &NoImports).diagnostics.is_empty());
    }

    #[test]
    fn test_syntax_error_skips_inference() {
        let check = check_module("local x: number = 'hi'\nlocal = 2", &options(Mode::Strict), &NoImports);
        assert!(check.graph.parse_failed);
        assert!(check.diagnostics.iter().all(|d| d.code == "SyntaxError"));
        assert!(!check.diagnostics.is_empty());
    }

    #[test]
    fn test_autocomplete_check_tolerates_syntax_errors() {
        let source = "local t = { name = 'x' }\nlocal n = t.";
        let check = check_for_autocomplete(source, &options(Mode::Nonstrict), &NoImports);
        assert!(check.graph.parse_failed);
        assert!(!check.graph.binding_types.is_empty());
        assert!(check.diagnostics.iter().any(|d| d.code == "SyntaxError"));
    }

    #[test]
    fn test_lint_warnings_are_warnings() {
        let check = check_module("local t = { a = 1, a = 2 }", &options(Mode::Nonstrict), &NoImports);
        assert_eq!(check.diagnostics.len(), 1);
        assert_eq!(check.diagnostics[0].severity, Severity::Warning);
        assert_eq!(check.diagnostics[0].code, "DuplicateKeys");
    }

    #[test]
    fn test_both_solvers_agree_on_simple_errors() {
        for solver in [SolverKind::New, SolverKind::Old] {
            let options = CheckOptions { mode: Mode::Strict, solver, ..CheckOptions::default() };
            let check = check_module("local s: string = 1 + 2", &options, &NoImports);
            let codes: Vec<&str> = check.diagnostics.iter().map(|d| d.code.as_str()).collect();
            assert_eq!(codes, vec!["TypeMismatch"]);
        }
    }

    #[test]
    fn test_requires_collected() {
        let check = check_module("local a = require('a')\nlocal b = require('./b')", &options(Mode::NoCheck), &NoImports);
        let paths: Vec<&str> = check.requires.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "./b"]);
    }
}
