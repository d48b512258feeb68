//! Uses of deprecated builtins

use luau_ast::visit::{walk_expr, Visitor};
use luau_ast::{Expr, ExprKind};

use super::{LintContext, LintPass, LintWarning};
use crate::builtins::is_deprecated;

pub struct DeprecatedApi;

impl LintPass for DeprecatedApi {
    fn name(&self) -> &'static str {
        "DeprecatedApi"
    }

    fn run(&self, ctx: &LintContext<'_>) -> Vec<LintWarning> {
        let mut visitor = DeprecatedVisitor { warnings: Vec::new() };
        visitor.visit_block(&ctx.chunk.block);
        visitor.warnings
    }
}

struct DeprecatedVisitor {
    warnings: Vec<LintWarning>,
}

/// `a.b.c` where `a` is a global
fn global_path(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Global(name) => Some(name.clone()),
        ExprKind::IndexName { object, name, is_method: false, .. } => {
            global_path(object).map(|prefix| format!("{}.{}", prefix, name))
        }
        _ => None,
    }
}

impl<'ast> Visitor<'ast> for DeprecatedVisitor {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        match &expr.kind {
            ExprKind::Global(name) if is_deprecated(name) => {
                self.warnings.push(LintWarning {
                    code: "DeprecatedApi",
                    message: format!("Global '{}' is deprecated", name),
                    span: expr.span,
                });
            }
            ExprKind::IndexName { .. } => {
                if let Some(path) = global_path(expr).filter(|p| is_deprecated(p)) {
                    self.warnings.push(LintWarning {
                        code: "DeprecatedApi",
                        message: format!("Member '{}' is deprecated", path),
                        span: expr.span,
                    });
                    return;
                }
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::lint_with;

    fn messages(source: &str) -> Vec<String> {
        lint_with(&DeprecatedApi, source).into_iter().map(|w| w.message).collect()
    }

    #[test]
    fn test_deprecated_member() {
        assert_eq!(messages("print(table.getn({}))"), vec!["Member 'table.getn' is deprecated"]);
    }

    #[test]
    fn test_deprecated_global() {
        assert_eq!(messages("local env = getfenv(1)"), vec!["Global 'getfenv' is deprecated"]);
    }

    #[test]
    fn test_local_with_same_name_is_fine() {
        let source = "local table = { getn = function() end }\ntable.getn()\nlocal t = table.insert";
        assert!(messages(source).is_empty());
    }
}
