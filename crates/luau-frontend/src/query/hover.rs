use luau_ast::ExprKind;
use luau_checker::{display, ModuleCheck, TypeId};

use super::locate::{node_at, Located};

/// Markdown type signature of the node under `offset`: `name: type` for
/// identifiers and member names, the bare type for other expressions.
pub fn hover(check: &ModuleCheck, offset: usize) -> Option<String> {
    let graph = &check.graph;
    let (name, ty): (Option<&str>, TypeId) = match node_at(&check.chunk, offset)? {
        Located::Binding(binding) => (Some(&binding.name), graph.binding_type(binding.id)?),
        Located::Expr(expr) => match &expr.kind {
            ExprKind::Local { name, binding } => (
                Some(name),
                graph.expr_type(expr.id).or_else(|| graph.binding_type(*binding))?,
            ),
            ExprKind::Global(name) => (
                Some(name),
                graph.expr_type(expr.id).or_else(|| graph.global_type(name))?,
            ),
            ExprKind::IndexName { name, name_span, .. } if !name.is_empty() && name_span.contains(offset) => {
                (Some(name), graph.expr_type(expr.id)?)
            }
            _ => (None, graph.expr_type(expr.id)?),
        },
    };

    let ty = display(&graph.arena, ty);
    Some(match name {
        Some(name) => format!("```luau\n{}: {}\n```", name, ty),
        None => format!("```luau\n{}\n```", ty),
    })
}
