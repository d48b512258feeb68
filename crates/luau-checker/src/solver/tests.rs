use luau_ast::{Chunk, StatKind};
use luau_parser::parse;
use pretty_assertions::assert_eq;

use super::solver_for;
use crate::ctx::SolveConfig;
use crate::display::display;
use crate::error::{TypeError, TypeErrorKind};
use crate::graph::{ModuleImport, ModuleImports, NoImports, TypeGraph};
use crate::options::{Limits, Mode, SolverKind};

const SOLVERS: [SolverKind; 2] = [SolverKind::New, SolverKind::Old];

fn parse_ok(source: &str) -> Chunk {
    let parsed = parse(source);
    assert!(parsed.errors.is_empty(), "unexpected parse errors: {:?}", parsed.errors);
    parsed.chunk
}

fn check_with(
    source: &str,
    mode: Mode,
    kind: SolverKind,
    imports: &dyn ModuleImports,
) -> (Chunk, TypeGraph, Vec<TypeError>) {
    let chunk = parse_ok(source);
    let config = SolveConfig { mode, limits: Limits::default(), imports };
    let (graph, errors) = solver_for(kind).check(&chunk, &config);
    (chunk, graph, errors)
}

fn errors(source: &str, mode: Mode, kind: SolverKind) -> Vec<TypeError> {
    check_with(source, mode, kind, &NoImports).2
}

fn messages(source: &str, mode: Mode, kind: SolverKind) -> Vec<String> {
    errors(source, mode, kind).iter().map(|e| e.kind.to_string()).collect()
}

/// Display of the first binding of the `index`th top-level statement
fn local_type(source: &str, mode: Mode, kind: SolverKind, index: usize) -> String {
    let (chunk, graph, _) = check_with(source, mode, kind, &NoImports);
    let id = match &chunk.block.stats[index].kind {
        StatKind::Local { bindings, .. } => bindings[0].id,
        StatKind::LocalFunction { binding, .. } => binding.id,
        other => panic!("not a local: {:?}", other),
    };
    let ty = graph.binding_type(id).expect("binding has a type");
    display(&graph.arena, ty)
}

struct Modules(Vec<(&'static str, TypeGraph)>);

impl ModuleImports for Modules {
    fn import(&self, path: &str) -> ModuleImport<'_> {
        match self.0.iter().find(|(name, _)| *name == path) {
            Some((name, graph)) => ModuleImport::Resolved { name, graph },
            None => ModuleImport::Unresolved,
        }
    }
}

fn module(name: &'static str, source: &str, kind: SolverKind) -> (&'static str, TypeGraph) {
    let (_, graph, errors) = check_with(source, Mode::Strict, kind, &NoImports);
    assert!(errors.is_empty(), "{:?}", errors);
    (name, graph)
}

#[test]
fn test_annotation_mismatch_at_literal() {
    for kind in SOLVERS {
        let errors = errors("local x: number = 'hi'", Mode::Strict, kind);
        assert_eq!(errors.len(), 1, "{} solver: {:?}", kind, errors);
        assert_eq!(errors[0].span.start, 18);
        assert_eq!(errors[0].span.end, 22);
        assert_eq!(
            errors[0].kind.to_string(),
            "Type 'string' could not be converted into 'number'"
        );
    }
}

#[test]
fn test_unannotated_param_inferred_only_in_strict() {
    let source = "local function f(x) return x + 1 end\nf(\"s\")";
    for kind in SOLVERS {
        let strict = errors(source, Mode::Strict, kind);
        assert_eq!(strict.len(), 1, "{} solver: {:?}", kind, strict);
        assert!(matches!(strict[0].kind, TypeErrorKind::TypeMismatch { .. }));
        assert!(errors(source, Mode::Nonstrict, kind).is_empty());
    }
}

#[test]
fn test_unknown_global() {
    for kind in SOLVERS {
        for mode in [Mode::Strict, Mode::Nonstrict] {
            assert_eq!(messages("print(foo)", mode, kind), vec!["Unknown global 'foo'"]);
        }
    }
}

#[test]
fn test_missing_key_on_sealed_table() {
    let source = "local t: { a: number } = { a = 1 }\nlocal y = t.b";
    for kind in SOLVERS {
        let errors = errors(source, Mode::Strict, kind);
        assert_eq!(errors.len(), 1, "{} solver: {:?}", kind, errors);
        assert_eq!(errors[0].kind.code(), "UnknownProperty");
    }
}

#[test]
fn test_call_arity() {
    let source = "local function f(a: number, b: number) end\nf(1)";
    for kind in SOLVERS {
        assert_eq!(
            messages(source, Mode::Strict, kind),
            vec!["Argument count mismatch. Function expects 2 arguments, but 1 is specified"]
        );
    }
}

#[test]
fn test_literal_types() {
    for kind in SOLVERS {
        assert_eq!(local_type("local n = 5", Mode::Strict, kind, 0), "number");
        assert_eq!(local_type("local s = 'a' .. 'b'", Mode::Strict, kind, 0), "string");
        assert_eq!(local_type("local b = 1 < 2", Mode::Strict, kind, 0), "boolean");
    }
}

#[test]
fn test_old_solver_generalizes() {
    let source = "local function id(x) return x end";
    assert_eq!(local_type(source, Mode::Strict, SolverKind::Old, 0), "<a>(x: a) -> a");
}

#[test]
fn test_new_solver_defaults_unconstrained_params() {
    let source = "local function id(x) return x end";
    assert_eq!(
        local_type(source, Mode::Strict, SolverKind::New, 0),
        "(x: unknown) -> unknown"
    );
    assert_eq!(local_type(source, Mode::Nonstrict, SolverKind::New, 0), "(x: any) -> any");
}

#[test]
fn test_recursive_function() {
    let source = "local function fact(n) if n <= 1 then return 1 end return n * fact(n - 1) end";
    for kind in SOLVERS {
        let (_, _, errors) = check_with(source, Mode::Strict, kind, &NoImports);
        assert!(errors.is_empty(), "{} solver: {:?}", kind, errors);
        let ty = local_type(source, Mode::Strict, kind, 0);
        assert!(ty.ends_with("-> number"), "{} solver: {}", kind, ty);
    }
}

#[test]
fn test_methods_see_each_other_through_self() {
    let source = "local T = {}\n\
                  function T:a() return self:b() end\n\
                  function T:b() return 1 end\n\
                  local r = T:a()";
    for kind in SOLVERS {
        let (chunk, graph, errors) = check_with(source, Mode::Nonstrict, kind, &NoImports);
        assert!(errors.is_empty(), "{} solver: {:?}", kind, errors);
        if kind == SolverKind::New {
            let StatKind::Local { bindings, .. } = &chunk.block.stats[3].kind else {
                panic!("expected local");
            };
            let ty = graph.binding_type(bindings[0].id).expect("typed");
            assert_eq!(display(&graph.arena, ty), "number");
        }
    }
}

#[test]
fn test_global_function_used_before_definition() {
    let source = "local y = f()\nfunction f() return 'x' end";
    assert_eq!(local_type(source, Mode::Strict, SolverKind::New, 0), "string");
}

#[test]
fn test_refinement_strips_nil() {
    let source = "local function f(x: number?)\n  if x then\n    local y: number = x\n  end\nend";
    for kind in SOLVERS {
        assert!(errors(source, Mode::Strict, kind).is_empty(), "{} solver", kind);
    }
}

#[test]
fn test_optional_access_in_strict() {
    let source = "local function f(t: { a: number }?) return t.a end";
    for kind in SOLVERS {
        let errors = errors(source, Mode::Strict, kind);
        assert_eq!(errors.len(), 1, "{} solver: {:?}", kind, errors);
        assert_eq!(errors[0].kind.code(), "OptionalValueAccess");
    }
}

#[test]
fn test_not_callable() {
    for kind in SOLVERS {
        assert_eq!(
            messages("local n = 1\nn()", Mode::Strict, kind),
            vec!["Cannot call non-function number"]
        );
    }
}

#[test]
fn test_module_type() {
    for kind in SOLVERS {
        let (_, graph, _) = check_with("return { f = function() end }", Mode::Strict, kind, &NoImports);
        let ty = graph.module_type.expect("module returns one value");
        assert_eq!(display(&graph.arena, ty), "{ f: () -> () }");

        let (_, graph, _) = check_with("return 1, 2", Mode::Strict, kind, &NoImports);
        assert!(graph.module_type.is_none());
    }
}

#[test]
fn test_require_imports_module_type() {
    for kind in SOLVERS {
        let modules = Modules(vec![module("util", "return { f = function() return 1 end }", kind)]);

        let ok = "local u = require('util')\nlocal n: number = u.f()";
        let (_, _, errors) = check_with(ok, Mode::Strict, kind, &modules);
        assert!(errors.is_empty(), "{} solver: {:?}", kind, errors);

        let bad = "local u = require('util')\nlocal s: string = u.f()";
        let (_, _, errors) = check_with(bad, Mode::Strict, kind, &modules);
        assert_eq!(errors.len(), 1, "{} solver: {:?}", kind, errors);
    }
}

#[test]
fn test_require_exported_types() {
    for kind in SOLVERS {
        let modules = Modules(vec![module("shapes", "export type Point = { x: number }\nreturn {}", kind)]);
        let source = "local shapes = require('shapes')\nlocal p: shapes.Point = { x = 'no' }";
        let (_, _, errors) = check_with(source, Mode::Strict, kind, &modules);
        assert_eq!(errors.len(), 1, "{} solver: {:?}", kind, errors);
        assert_eq!(errors[0].kind.code(), "TypeMismatch");
    }
}

#[test]
fn test_unresolved_require() {
    for kind in SOLVERS {
        let (_, graph, errors) = check_with("local m = require('nope')", Mode::Strict, kind, &NoImports);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind.to_string(), "Unknown require: nope");
        assert!(graph.module_type.is_none());
    }
}

#[test]
fn test_strict_rejects_new_globals() {
    for kind in SOLVERS {
        assert_eq!(errors("x = 1", Mode::Strict, kind).len(), 1);
        assert!(errors("x = 1\nprint(x)", Mode::Nonstrict, kind).is_empty());
    }
}

#[test]
fn test_solver_iteration_limit() {
    let chunk = parse_ok("local y = f()\nfunction f() return 1 end");
    let limits = Limits { max_solver_iterations: 1, ..Limits::default() };
    let config = SolveConfig { mode: Mode::Strict, limits, imports: &NoImports };
    let (_, errors) = solver_for(SolverKind::New).check(&chunk, &config);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, TypeErrorKind::CodeTooComplex);
}
