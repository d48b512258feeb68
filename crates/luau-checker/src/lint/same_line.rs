//! Statements that start on the line where the previous one ended

use luau_ast::visit::{walk_block, Visitor};
use luau_ast::Block;

use super::{LintContext, LintPass, LintWarning};

pub struct SameLineStatement;

impl LintPass for SameLineStatement {
    fn name(&self) -> &'static str {
        "SameLineStatement"
    }

    fn run(&self, ctx: &LintContext<'_>) -> Vec<LintWarning> {
        let mut visitor = SameLineVisitor { ctx, warnings: Vec::new() };
        visitor.visit_block(&ctx.chunk.block);
        visitor.warnings
    }
}

struct SameLineVisitor<'c, 'a> {
    ctx: &'c LintContext<'a>,
    warnings: Vec<LintWarning>,
}

impl<'ast> Visitor<'ast> for SameLineVisitor<'_, '_> {
    fn visit_block(&mut self, block: &'ast Block) {
        let mut reported_line = None;
        for pair in block.stats.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let line = self.ctx.lines.line_of(next.span.start);
            if self.ctx.lines.line_of(prev.span.end) != line || reported_line == Some(line) {
                continue;
            }
            let between = self.ctx.text(luau_ast::Span::new(prev.span.end, next.span.start));
            if between.contains(';') {
                continue;
            }
            self.warnings.push(LintWarning {
                code: "SameLineStatement",
                message: "A new statement is on the same line; add semi-colon on previous statement to silence"
                    .to_string(),
                span: next.span,
            });
            reported_line = Some(line);
        }
        walk_block(self, block);
    }
}
