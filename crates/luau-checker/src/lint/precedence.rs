//! Comparisons whose precedence is easy to misread

use luau_ast::visit::{walk_expr, Visitor};
use luau_ast::{BinaryOp, Expr, ExprKind, UnaryOp};

use super::{LintContext, LintPass, LintWarning};

pub struct ComparisonPrecedence;

impl LintPass for ComparisonPrecedence {
    fn name(&self) -> &'static str {
        "ComparisonPrecedence"
    }

    fn run(&self, ctx: &LintContext<'_>) -> Vec<LintWarning> {
        let mut visitor = PrecedenceVisitor { ctx, warnings: Vec::new() };
        visitor.visit_block(&ctx.chunk.block);
        visitor.warnings
    }
}

struct PrecedenceVisitor<'c, 'a> {
    ctx: &'c LintContext<'a>,
    warnings: Vec<LintWarning>,
}

impl PrecedenceVisitor<'_, '_> {
    fn check(&mut self, expr: &Expr, op: BinaryOp, left: &Expr, right: &Expr) {
        let message = match &left.kind {
            ExprKind::Unary { op: UnaryOp::Not, operand } if matches!(op, BinaryOp::Eq | BinaryOp::Ne) => {
                let (x, y) = (self.ctx.text(operand.span), self.ctx.text(right.span));
                let opposite = if op == BinaryOp::Eq { "~=" } else { "==" };
                format!(
                    "not {x} {op} {y} is equivalent to (not {x}) {op} {y}; consider using {x} {opposite} {y}, or wrap one of the expressions in parentheses to silence",
                    x = x,
                    y = y,
                    op = op.symbol(),
                    opposite = opposite
                )
            }
            ExprKind::Binary { op: inner, left: a, right: b } if op.is_comparison() && inner.is_comparison() => {
                format!(
                    "{a} {inner} {b} {op} {c} is equivalent to ({a} {inner} {b}) {op} {c}; wrap one of the expressions in parentheses to silence",
                    a = self.ctx.text(a.span),
                    b = self.ctx.text(b.span),
                    c = self.ctx.text(right.span),
                    inner = inner.symbol(),
                    op = op.symbol()
                )
            }
            _ => return,
        };
        self.warnings.push(LintWarning { code: "ComparisonPrecedence", message, span: expr.span });
    }
}

impl<'ast> Visitor<'ast> for PrecedenceVisitor<'_, '_> {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        if let ExprKind::Binary { op, left, right } = &expr.kind {
            self.check(expr, *op, left, right);
        }
        walk_expr(self, expr);
    }
}
