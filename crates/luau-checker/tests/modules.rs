//! Checking modules against each other through `ModuleImports`

use luau_checker::{
    check_module, display, CheckOptions, Mode, ModuleImport, ModuleImports, NoImports, SolverKind, TypeGraph,
};
use pretty_assertions::assert_eq;

/// A fixed set of already checked modules plus the special outcomes
#[derive(Default)]
struct Project {
    modules: Vec<(String, TypeGraph)>,
    cyclic: Vec<(String, String)>,
    broken: Vec<String>,
}

impl Project {
    fn add(&mut self, name: &str, source: &str, solver: SolverKind) {
        let options = CheckOptions { mode: Mode::Strict, solver, ..CheckOptions::default() };
        let check = check_module(source, &options, &*self);
        assert!(!check.has_errors(), "{}: {:?}", name, check.diagnostics);
        self.modules.push((name.to_string(), check.graph));
    }
}

impl ModuleImports for Project {
    fn import(&self, path: &str) -> ModuleImport<'_> {
        if let Some((_, cycle)) = self.cyclic.iter().find(|(p, _)| p == path) {
            return ModuleImport::Cyclic(cycle);
        }
        if self.broken.iter().any(|p| p == path) {
            return ModuleImport::Unavailable;
        }
        match self.modules.iter().find(|(name, _)| name == path) {
            Some((name, graph)) => ModuleImport::Resolved { name, graph },
            None => ModuleImport::Unresolved,
        }
    }
}

fn codes(source: &str, mode: Mode, solver: SolverKind, imports: &dyn ModuleImports) -> Vec<String> {
    let options = CheckOptions { mode, solver, ..CheckOptions::default() };
    check_module(source, &options, imports)
        .diagnostics
        .into_iter()
        .map(|d| d.code)
        .collect()
}

const SOLVERS: [SolverKind; 2] = [SolverKind::New, SolverKind::Old];

#[test]
fn test_imported_function_signature() {
    for solver in SOLVERS {
        let mut project = Project::default();
        project.add("math2", "local M = {}\nfunction M.double(n: number): number return n * 2 end\nreturn M", solver);

        let ok = "local m = require('math2')\nlocal x: number = m.double(2)";
        assert!(codes(ok, Mode::Strict, solver, &project).is_empty(), "{}", solver);

        let bad = "local m = require('math2')\nlocal x = m.double('two')";
        assert_eq!(codes(bad, Mode::Strict, solver, &project), vec!["TypeMismatch"]);
    }
}

#[test]
fn test_imported_tables_are_sealed() {
    for solver in SOLVERS {
        let mut project = Project::default();
        project.add("cfg", "return { debug = false }", solver);
        let source = "local cfg = require('cfg')\ncfg.verbose = true";
        assert_eq!(codes(source, Mode::Strict, solver, &project), vec!["CannotExtendTable"]);
    }
}

#[test]
fn test_dependency_graph_unchanged_by_import() {
    let mut project = Project::default();
    project.add("util", "return { f = function() return 1 end }", SolverKind::New);
    let before = project.modules[0].1.arena.len();
    codes("local u = require('util')\nlocal y = u.f()", Mode::Strict, SolverKind::New, &project);
    assert_eq!(project.modules[0].1.arena.len(), before);
}

#[test]
fn test_cyclic_require() {
    let project = Project {
        cyclic: vec![("a".to_string(), "a -> b -> a".to_string())],
        ..Project::default()
    };
    let options = CheckOptions { mode: Mode::Strict, ..CheckOptions::default() };
    let check = check_module("local a = require('a')\nlocal n: number = a.anything", &options, &project);
    let messages: Vec<&str> = check.diagnostics.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(messages, vec!["Cyclic module dependency: a -> b -> a"]);
}

#[test]
fn test_broken_dependency_is_silent() {
    let project = Project { broken: vec!["bad".to_string()], ..Project::default() };
    for solver in SOLVERS {
        let source = "local b = require('bad')\nlocal x = b.value";
        assert!(codes(source, Mode::Strict, solver, &project).is_empty());
    }
}

#[test]
fn test_module_without_single_return() {
    for solver in SOLVERS {
        let mut project = Project::default();
        project.add("empty", "local x = 1", solver);
        let codes = codes("local e = require('empty')", Mode::Strict, solver, &project);
        assert_eq!(codes, vec!["IllegalRequire"]);
    }
}

#[test]
fn test_unresolved_require_message() {
    let options = CheckOptions { mode: Mode::Nonstrict, ..CheckOptions::default() };
    let check = check_module("local m = require('./missing')", &options, &NoImports);
    assert_eq!(check.diagnostics.len(), 1);
    assert_eq!(check.diagnostics[0].message, "Unknown require: ./missing");
    assert_eq!(check.diagnostics[0].range.start.column, 10);
}

#[test]
fn test_module_type_display() {
    let mut project = Project::default();
    project.add("shape", "return { area = function(w: number, h: number) return w * h end }", SolverKind::Old);
    let graph = &project.modules[0].1;
    let ty = graph.module_type.expect("single return");
    assert_eq!(display(&graph.arena, ty), "{ area: (w: number, h: number) -> number }");
}
