//! Local declaration lints

use luau_ast::visit::{walk_function, walk_stat, Visitor};
use luau_ast::{Binding, FunctionBody, Stat, StatKind};
use rustc_hash::FxHashMap;

use super::{LintContext, LintPass, LintWarning};

/// Names never reported
fn is_ignored(name: &str) -> bool {
    name == "_" || name == "self"
}

/// Warns when a local hides an earlier local of the same name
pub struct LocalShadow;

impl LintPass for LocalShadow {
    fn name(&self) -> &'static str {
        "LocalShadow"
    }

    fn run(&self, ctx: &LintContext<'_>) -> Vec<LintWarning> {
        let mut visitor = ShadowVisitor {
            ctx,
            scopes: vec![FxHashMap::default()],
            group: 0,
            warnings: Vec::new(),
        };
        visitor.visit_block(&ctx.chunk.block);
        visitor.warnings
    }
}

struct Declared {
    line: u32,
    /// Declarations made by the same statement are DuplicateLocal's job
    group: usize,
}

struct ShadowVisitor<'c, 'a> {
    ctx: &'c LintContext<'a>,
    scopes: Vec<FxHashMap<String, Declared>>,
    group: usize,
    warnings: Vec<LintWarning>,
}

impl ShadowVisitor<'_, '_> {
    fn scoped(&mut self, f: impl FnOnce(&mut Self)) {
        self.scopes.push(FxHashMap::default());
        f(self);
        self.scopes.pop();
    }
}

impl<'ast> Visitor<'ast> for ShadowVisitor<'_, '_> {
    fn visit_block(&mut self, block: &'ast luau_ast::Block) {
        self.scoped(|this| {
            for stat in &block.stats {
                this.visit_stat(stat);
            }
        });
    }

    fn visit_stat(&mut self, stat: &'ast Stat) {
        self.group += 1;
        match &stat.kind {
            StatKind::NumericFor { .. } | StatKind::GenericFor { .. } => {
                self.scoped(|this| walk_stat(this, stat));
            }
            _ => walk_stat(self, stat),
        }
    }

    fn visit_function(&mut self, func: &'ast FunctionBody) {
        self.group += 1;
        self.scoped(|this| walk_function(this, func));
    }

    fn visit_binding(&mut self, binding: &'ast Binding) {
        if is_ignored(&binding.name) {
            return;
        }
        let previous = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&binding.name))
            .filter(|d| d.group != self.group)
            .map(|d| d.line);
        if let Some(line) = previous {
            self.warnings.push(LintWarning {
                code: "LocalShadow",
                message: format!(
                    "Variable '{}' shadows previous declaration at line {}",
                    binding.name, line
                ),
                span: binding.span,
            });
        }
        if let Some(scope) = self.scopes.last_mut() {
            let line = self.ctx.line(binding.span.start);
            scope.insert(binding.name.clone(), Declared { line, group: self.group });
        }
    }
}

/// Warns when one statement or parameter list declares a name twice
pub struct DuplicateLocal;

impl LintPass for DuplicateLocal {
    fn name(&self) -> &'static str {
        "DuplicateLocal"
    }

    fn run(&self, ctx: &LintContext<'_>) -> Vec<LintWarning> {
        let mut visitor = DuplicateVisitor { ctx, warnings: Vec::new() };
        visitor.visit_block(&ctx.chunk.block);
        visitor.warnings
    }
}

struct DuplicateVisitor<'c, 'a> {
    ctx: &'c LintContext<'a>,
    warnings: Vec<LintWarning>,
}

impl DuplicateVisitor<'_, '_> {
    fn check(&mut self, bindings: &[Binding]) {
        let mut seen: FxHashMap<&str, u32> = FxHashMap::default();
        for binding in bindings {
            if is_ignored(&binding.name) {
                continue;
            }
            match seen.get(binding.name.as_str()) {
                Some(line) => self.warnings.push(LintWarning {
                    code: "DuplicateLocal",
                    message: format!("Variable '{}' already defined on line {}", binding.name, line),
                    span: binding.span,
                }),
                None => {
                    seen.insert(&binding.name, self.ctx.line(binding.span.start));
                }
            }
        }
    }
}

impl<'ast> Visitor<'ast> for DuplicateVisitor<'_, '_> {
    fn visit_stat(&mut self, stat: &'ast Stat) {
        match &stat.kind {
            StatKind::Local { bindings, .. } => self.check(bindings),
            StatKind::GenericFor { vars, .. } => self.check(vars),
            _ => {}
        }
        walk_stat(self, stat);
    }

    fn visit_function(&mut self, func: &'ast FunctionBody) {
        self.check(&func.params);
        walk_function(self, func);
    }
}
