//! Read-only AST traversal
//!
//! Implementors override the `visit_*` hooks they care about and call the
//! matching `walk_*` function to continue into children.

use crate::*;

pub trait Visitor<'ast> {
    fn visit_block(&mut self, block: &'ast Block) {
        walk_block(self, block);
    }

    fn visit_stat(&mut self, stat: &'ast Stat) {
        walk_stat(self, stat);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        walk_expr(self, expr);
    }

    fn visit_function(&mut self, func: &'ast FunctionBody) {
        walk_function(self, func);
    }

    fn visit_binding(&mut self, binding: &'ast Binding) {
        if let Some(annotation) = &binding.annotation {
            self.visit_type(annotation);
        }
    }

    fn visit_type(&mut self, ty: &'ast TypeExpr) {
        walk_type(self, ty);
    }
}

pub fn walk_block<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, block: &'ast Block) {
    for stat in &block.stats {
        visitor.visit_stat(stat);
    }
}

pub fn walk_stat<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, stat: &'ast Stat) {
    match &stat.kind {
        StatKind::Local { bindings, values } => {
            for value in values {
                visitor.visit_expr(value);
            }
            for binding in bindings {
                visitor.visit_binding(binding);
            }
        }
        StatKind::LocalFunction { binding, func } => {
            visitor.visit_binding(binding);
            visitor.visit_function(func);
        }
        StatKind::Function { target, func } => {
            visitor.visit_expr(target);
            visitor.visit_function(func);
        }
        StatKind::Assign { targets, values } => {
            for target in targets {
                visitor.visit_expr(target);
            }
            for value in values {
                visitor.visit_expr(value);
            }
        }
        StatKind::CompoundAssign { target, value, .. } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }
        StatKind::Call(expr) => visitor.visit_expr(expr),
        StatKind::If { clauses, else_block } => {
            for (condition, body) in clauses {
                visitor.visit_expr(condition);
                visitor.visit_block(body);
            }
            if let Some(block) = else_block {
                visitor.visit_block(block);
            }
        }
        StatKind::While { condition, body } => {
            visitor.visit_expr(condition);
            visitor.visit_block(body);
        }
        StatKind::Repeat { body, condition } => {
            visitor.visit_block(body);
            visitor.visit_expr(condition);
        }
        StatKind::NumericFor { var, start, end, step, body } => {
            visitor.visit_expr(start);
            visitor.visit_expr(end);
            if let Some(step) = step {
                visitor.visit_expr(step);
            }
            visitor.visit_binding(var);
            visitor.visit_block(body);
        }
        StatKind::GenericFor { vars, values, body } => {
            for value in values {
                visitor.visit_expr(value);
            }
            for var in vars {
                visitor.visit_binding(var);
            }
            visitor.visit_block(body);
        }
        StatKind::Do(block) => visitor.visit_block(block),
        StatKind::Return(values) => {
            for value in values {
                visitor.visit_expr(value);
            }
        }
        StatKind::TypeAlias { ty, .. } => visitor.visit_type(ty),
        StatKind::Error { exprs } => {
            for expr in exprs {
                visitor.visit_expr(expr);
            }
        }
        StatKind::Break | StatKind::Continue => {}
    }
}

pub fn walk_expr<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, expr: &'ast Expr) {
    match &expr.kind {
        ExprKind::Group(inner) => visitor.visit_expr(inner),
        ExprKind::Function(func) => visitor.visit_function(func),
        ExprKind::Table(items) => {
            for item in items {
                if let TableItem::Keyed { key, .. } = item {
                    visitor.visit_expr(key);
                }
                visitor.visit_expr(item.value());
            }
        }
        ExprKind::Call { func, args, .. } => {
            visitor.visit_expr(func);
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        ExprKind::IndexName { object, .. } => visitor.visit_expr(object),
        ExprKind::IndexExpr { object, index } => {
            visitor.visit_expr(object);
            visitor.visit_expr(index);
        }
        ExprKind::Unary { operand, .. } => visitor.visit_expr(operand),
        ExprKind::Binary { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        ExprKind::TypeAssertion { expr, ty } => {
            visitor.visit_expr(expr);
            visitor.visit_type(ty);
        }
        ExprKind::IfElse { condition, then_expr, else_expr } => {
            visitor.visit_expr(condition);
            visitor.visit_expr(then_expr);
            visitor.visit_expr(else_expr);
        }
        ExprKind::Nil
        | ExprKind::Bool(_)
        | ExprKind::Number(_)
        | ExprKind::String(_)
        | ExprKind::Varargs
        | ExprKind::Local { .. }
        | ExprKind::Global(_)
        | ExprKind::Error => {}
    }
}

pub fn walk_function<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, func: &'ast FunctionBody) {
    if let Some(self_binding) = &func.self_binding {
        visitor.visit_binding(self_binding);
    }
    for param in &func.params {
        visitor.visit_binding(param);
    }
    if let Some(annotation) = func.vararg.as_ref().and_then(|v| v.annotation.as_ref()) {
        visitor.visit_type(annotation);
    }
    if let Some(returns) = &func.return_annotation {
        walk_type_pack(visitor, returns);
    }
    visitor.visit_block(&func.body);
}

pub fn walk_type_pack<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, pack: &'ast TypePack) {
    for ty in &pack.types {
        visitor.visit_type(ty);
    }
    if let Some(variadic) = &pack.variadic {
        visitor.visit_type(variadic);
    }
}

pub fn walk_type<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, ty: &'ast TypeExpr) {
    match &ty.kind {
        TypeExprKind::Reference { params, .. } => {
            for param in params {
                visitor.visit_type(param);
            }
        }
        TypeExprKind::Typeof(expr) => visitor.visit_expr(expr),
        TypeExprKind::Table { props, indexer } => {
            for prop in props {
                visitor.visit_type(&prop.ty);
            }
            if let Some(indexer) = indexer {
                visitor.visit_type(&indexer.0);
                visitor.visit_type(&indexer.1);
            }
        }
        TypeExprKind::Function { params, variadic, returns, .. } => {
            for param in params {
                visitor.visit_type(&param.ty);
            }
            if let Some(variadic) = variadic {
                visitor.visit_type(variadic);
            }
            walk_type_pack(visitor, returns);
        }
        TypeExprKind::Union(types) | TypeExprKind::Intersection(types) => {
            for ty in types {
                visitor.visit_type(ty);
            }
        }
        TypeExprKind::Optional(inner) | TypeExprKind::Group(inner) => visitor.visit_type(inner),
        TypeExprKind::StringSingleton(_)
        | TypeExprKind::BoolSingleton(_)
        | TypeExprKind::Nil
        | TypeExprKind::Error => {}
    }
}
