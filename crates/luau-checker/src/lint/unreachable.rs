//! Code after a statement that never falls through

use luau_ast::visit::{walk_block, Visitor};
use luau_ast::{Block, ExprKind, Stat, StatKind};

use super::{LintContext, LintPass, LintWarning};

pub struct UnreachableCode;

impl LintPass for UnreachableCode {
    fn name(&self) -> &'static str {
        "UnreachableCode"
    }

    fn run(&self, ctx: &LintContext<'_>) -> Vec<LintWarning> {
        let mut visitor = UnreachableVisitor { warnings: Vec::new() };
        visitor.visit_block(&ctx.chunk.block);
        visitor.warnings
    }
}

struct UnreachableVisitor {
    warnings: Vec<LintWarning>,
}

impl<'ast> Visitor<'ast> for UnreachableVisitor {
    fn visit_block(&mut self, block: &'ast Block) {
        // one warning per block, at the first dead statement
        if let Some(exit) = block.stats.iter().position(always_exits) {
            if let Some(dead) = block.stats.get(exit + 1) {
                self.warnings.push(LintWarning {
                    code: "UnreachableCode",
                    message: format!("Unreachable code (previous statement always {})", verb(&block.stats[exit])),
                    span: dead.span,
                });
            }
        }
        walk_block(self, block);
    }
}

fn verb(stat: &Stat) -> &'static str {
    match stat.kind {
        StatKind::Break => "breaks",
        StatKind::Continue => "continues",
        StatKind::Call(_) => "errors",
        _ => "returns",
    }
}

/// Whether control never reaches the statement after `stat`
fn always_exits(stat: &Stat) -> bool {
    match &stat.kind {
        StatKind::Return(_) | StatKind::Break | StatKind::Continue => true,
        StatKind::Call(call) => match &call.kind {
            ExprKind::Call { func, .. } => matches!(&func.kind, ExprKind::Global(name) if name == "error"),
            _ => false,
        },
        StatKind::Do(body) => block_exits(body),
        StatKind::If { clauses, else_block: Some(otherwise) } => {
            clauses.iter().all(|(_, body)| block_exits(body)) && block_exits(otherwise)
        }
        _ => false,
    }
}

fn block_exits(block: &Block) -> bool {
    block.stats.iter().any(always_exits)
}
