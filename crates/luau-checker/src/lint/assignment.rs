//! Assignments whose value count differs from the variable count

use luau_ast::visit::{walk_stat, Visitor};
use luau_ast::{Expr, Span, Stat, StatKind};

use super::{LintContext, LintPass, LintWarning};

pub struct UnbalancedAssignment;

impl LintPass for UnbalancedAssignment {
    fn name(&self) -> &'static str {
        "UnbalancedAssignment"
    }

    fn run(&self, ctx: &LintContext<'_>) -> Vec<LintWarning> {
        let mut visitor = AssignmentVisitor { warnings: Vec::new() };
        visitor.visit_block(&ctx.chunk.block);
        visitor.warnings
    }
}

struct AssignmentVisitor {
    warnings: Vec<LintWarning>,
}

impl AssignmentVisitor {
    fn check(&mut self, vars: usize, values: &[Expr], span: Span) {
        let Some(last) = values.last() else {
            return;
        };
        let message = if values.len() < vars && !last.is_multi_value() {
            format!(
                "Assigning {} values to {} variables initializes extra variables with nil; add 'nil' to value list to silence",
                values.len(),
                vars
            )
        } else if values.len() > vars {
            format!("Assigning {} values to {} variables leaves some values unused", values.len(), vars)
        } else {
            return;
        };
        self.warnings.push(LintWarning { code: "UnbalancedAssignment", message, span });
    }
}

impl<'ast> Visitor<'ast> for AssignmentVisitor {
    fn visit_stat(&mut self, stat: &'ast Stat) {
        match &stat.kind {
            StatKind::Local { bindings, values } => self.check(bindings.len(), values, stat.span),
            StatKind::Assign { targets, values } => self.check(targets.len(), values, stat.span),
            _ => {}
        }
        walk_stat(self, stat);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::lint_with;

    #[test]
    fn test_too_few_values() {
        let warnings = lint_with(&UnbalancedAssignment, "local a, b = 1");
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].message,
            "Assigning 1 values to 2 variables initializes extra variables with nil; add 'nil' to value list to silence"
        );
    }

    #[test]
    fn test_too_many_values() {
        let warnings = lint_with(&UnbalancedAssignment, "local a = 1\na = 1, 2");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "Assigning 2 values to 1 variables leaves some values unused");
    }

    #[test]
    fn test_trailing_call_fills_variables() {
        let source = "local a, b = pcall(print)\nlocal c, d = ...\nlocal e, f";
        assert!(lint_with(&UnbalancedAssignment, source).is_empty());
    }
}
