//! Discovery of `require` calls, shared by inference and dependency planning

use luau_ast::visit::{walk_expr, Visitor};
use luau_ast::{Chunk, Expr, ExprKind, Span};

/// A `require("path")` found in a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireRef {
    pub path: String,
    /// Span of the whole call
    pub span: Span,
    /// Span of the string literal argument
    pub path_span: Span,
}

/// Path and literal span if `expr` is `require` called with one string
/// literal. A local named `require` shadows the global and does not count.
pub fn require_path(expr: &Expr) -> Option<(&str, Span)> {
    let ExprKind::Call { func, args, .. } = &expr.kind else {
        return None;
    };
    if !matches!(&func.kind, ExprKind::Global(name) if name == "require") {
        return None;
    }
    match args.as_slice() {
        [Expr { kind: ExprKind::String(path), span, .. }] => Some((path.as_str(), *span)),
        _ => None,
    }
}

/// Every literal `require` in the module, in source order
pub fn find_requires(chunk: &Chunk) -> Vec<RequireRef> {
    struct Finder(Vec<RequireRef>);

    impl<'ast> Visitor<'ast> for Finder {
        fn visit_expr(&mut self, expr: &'ast Expr) {
            if let Some((path, path_span)) = require_path(expr) {
                self.0.push(RequireRef {
                    path: path.to_string(),
                    span: expr.span,
                    path_span,
                });
            }
            walk_expr(self, expr);
        }
    }

    let mut finder = Finder(Vec::new());
    finder.visit_block(&chunk.block);
    finder.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_nested_requires() {
        let source = "local a = require('a')\nlocal function f()\n  return require(\"./b\").x\nend\n";
        let parsed = luau_parser::parse(source);
        let paths: Vec<String> = find_requires(&parsed.chunk).into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["a".to_string(), "./b".to_string()]);
    }

    #[test]
    fn test_ignores_dynamic_and_shadowed_requires() {
        let source = "local p = 'x'\nrequire(p)\nlocal require = print\nrequire('y')\n";
        let parsed = luau_parser::parse(source);
        assert!(find_requires(&parsed.chunk).is_empty());
    }

    #[test]
    fn test_require_spans() {
        let source = "local a = require('util')";
        let parsed = luau_parser::parse(source);
        let found = find_requires(&parsed.chunk);
        assert_eq!(found.len(), 1);
        assert_eq!(&source[found[0].span.start..found[0].span.end], "require('util')");
        assert_eq!(&source[found[0].path_span.start..found[0].path_span.end], "'util'");
    }
}
