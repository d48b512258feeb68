//! Finding AST nodes and visible locals at a byte offset

use luau_ast::visit::{walk_expr, walk_stat, Visitor};
use luau_ast::{Binding, Block, Chunk, Expr, FunctionBody, Span, Stat, StatKind};

/// The smallest node under a position
#[derive(Debug, Clone, Copy)]
pub enum Located<'a> {
    Expr(&'a Expr),
    Binding(&'a Binding),
}

impl Located<'_> {
    pub fn span(&self) -> Span {
        match self {
            Located::Expr(expr) => expr.span,
            Located::Binding(binding) => binding.span,
        }
    }
}

/// Smallest expression or local binding whose span contains `offset`
pub fn node_at(chunk: &Chunk, offset: usize) -> Option<Located<'_>> {
    let mut finder = NodeFinder { offset, best: None };
    finder.visit_block(&chunk.block);
    finder.best
}

struct NodeFinder<'a> {
    offset: usize,
    best: Option<Located<'a>>,
}

impl<'a> NodeFinder<'a> {
    fn offer(&mut self, node: Located<'a>) {
        let better = match &self.best {
            Some(best) => node.span().len() <= best.span().len(),
            None => true,
        };
        if better {
            self.best = Some(node);
        }
    }
}

impl<'ast> Visitor<'ast> for NodeFinder<'ast> {
    fn visit_stat(&mut self, stat: &'ast Stat) {
        if stat.span.contains(self.offset) {
            walk_stat(self, stat);
        }
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        if expr.span.contains(self.offset) {
            self.offer(Located::Expr(expr));
            walk_expr(self, expr);
        }
    }

    fn visit_binding(&mut self, binding: &'ast Binding) {
        if binding.span.contains(self.offset) {
            self.offer(Located::Binding(binding));
        }
        if let Some(annotation) = &binding.annotation {
            self.visit_type(annotation);
        }
    }
}

/// Locals in scope at `offset`, outermost first. A name declared twice
/// appears twice; the later entry shadows the earlier one.
pub fn visible_locals(chunk: &Chunk, offset: usize) -> Vec<&Binding> {
    let mut out = Vec::new();
    scope_block(&chunk.block, offset, &mut out);
    out
}

fn scope_block<'a>(block: &'a Block, offset: usize, out: &mut Vec<&'a Binding>) {
    for stat in &block.stats {
        if stat.span.start >= offset {
            break;
        }
        if offset > stat.span.end {
            match &stat.kind {
                StatKind::Local { bindings, .. } => out.extend(bindings.iter()),
                StatKind::LocalFunction { binding, .. } => out.push(binding),
                _ => {}
            }
        } else {
            scope_stat(stat, offset, out);
        }
    }
}

/// Locals contributed by a statement the offset is inside of
fn scope_stat<'a>(stat: &'a Stat, offset: usize, out: &mut Vec<&'a Binding>) {
    match &stat.kind {
        StatKind::Local { values, .. } => scope_exprs(values, offset, out),
        StatKind::LocalFunction { binding, func } => {
            out.push(binding);
            scope_function(func, offset, out);
        }
        StatKind::Function { func, .. } => scope_function(func, offset, out),
        StatKind::Assign { targets, values } => {
            scope_exprs(targets, offset, out);
            scope_exprs(values, offset, out);
        }
        StatKind::CompoundAssign { target, value, .. } => {
            scope_expr(target, offset, out);
            scope_expr(value, offset, out);
        }
        StatKind::Call(expr) => scope_expr(expr, offset, out),
        StatKind::If { clauses, else_block } => {
            for (i, (condition, body)) in clauses.iter().enumerate() {
                if offset <= condition.span.end {
                    scope_expr(condition, offset, out);
                    return;
                }
                let in_later_branch = match clauses.get(i + 1) {
                    Some((next, _)) => offset >= next.span.start,
                    None => else_block.as_ref().is_some_and(|block| {
                        (!block.stats.is_empty() && offset >= block.span.start)
                            || (!body.stats.is_empty() && offset > body.span.end)
                    }),
                };
                if !in_later_branch {
                    scope_block(body, offset, out);
                    return;
                }
            }
            if let Some(block) = else_block {
                scope_block(block, offset, out);
            }
        }
        StatKind::While { condition, body } => {
            if offset <= condition.span.end {
                scope_expr(condition, offset, out);
            } else {
                scope_block(body, offset, out);
            }
        }
        StatKind::Repeat { body, condition } => {
            scope_block(body, offset, out);
            if condition.span.contains(offset) {
                scope_expr(condition, offset, out);
            }
        }
        StatKind::NumericFor { var, start, end, step, body } => {
            let header_end = step.as_ref().unwrap_or(end).span.end;
            if offset <= header_end {
                scope_expr(start, offset, out);
                scope_expr(end, offset, out);
                if let Some(step) = step {
                    scope_expr(step, offset, out);
                }
            } else {
                out.push(var);
                scope_block(body, offset, out);
            }
        }
        StatKind::GenericFor { vars, values, body } => {
            let header_end = values.last().map_or(stat.span.start, |v| v.span.end);
            if offset <= header_end {
                scope_exprs(values, offset, out);
            } else {
                out.extend(vars.iter());
                scope_block(body, offset, out);
            }
        }
        StatKind::Do(block) => scope_block(block, offset, out),
        StatKind::Return(values) => scope_exprs(values, offset, out),
        StatKind::Error { exprs } => scope_exprs(exprs, offset, out),
        StatKind::TypeAlias { .. } | StatKind::Break | StatKind::Continue => {}
    }
}

fn scope_exprs<'a>(exprs: &'a [Expr], offset: usize, out: &mut Vec<&'a Binding>) {
    for expr in exprs {
        scope_expr(expr, offset, out);
    }
}

/// Enter the function literal inside `expr` that contains the offset, if any
fn scope_expr<'a>(expr: &'a Expr, offset: usize, out: &mut Vec<&'a Binding>) {
    let mut finder = FunctionFinder { offset, found: None };
    finder.visit_expr(expr);
    if let Some(func) = finder.found {
        scope_function(func, offset, out);
    }
}

fn scope_function<'a>(func: &'a FunctionBody, offset: usize, out: &mut Vec<&'a Binding>) {
    if !func.span.contains(offset) {
        return;
    }
    out.extend(func.self_binding.iter());
    out.extend(func.params.iter());
    scope_block(&func.body, offset, out);
}

/// Outermost function literal containing the offset
struct FunctionFinder<'a> {
    offset: usize,
    found: Option<&'a FunctionBody>,
}

impl<'ast> Visitor<'ast> for FunctionFinder<'ast> {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        if self.found.is_none() && expr.span.contains(self.offset) {
            walk_expr(self, expr);
        }
    }

    fn visit_function(&mut self, func: &'ast FunctionBody) {
        if self.found.is_none() && func.span.contains(self.offset) {
            self.found = Some(func);
        }
    }
}
