//! Forward-pass inference with eager unification
//!
//! Statements are checked in source order. Every rule runs the moment its
//! inputs are typed; free types left in a function signature after its
//! body is checked are generalized.

use indexmap::IndexMap;
use luau_ast::{BinaryOp, Block, Chunk, Expr, ExprKind, FunctionBody, NodeId, Span, Stat, StatKind, TableItem};
use rustc_hash::FxHashMap;

use super::{merge_return_packs, module_value, Solver};
use crate::ctx::{truthy_refinements, CallArgs, InferCtx, SolveConfig};
use crate::error::{TypeError, TypeErrorKind};
use crate::graph::TypeGraph;
use crate::instantiate::generalize;
use crate::requires::require_path;
use crate::scope::{AliasDef, ResolveTypes, TypeScopes};
use crate::types::*;

pub struct OldSolver;

impl Solver for OldSolver {
    fn name(&self) -> &'static str {
        "old"
    }

    fn check(&self, chunk: &Chunk, config: &SolveConfig<'_>) -> (TypeGraph, Vec<TypeError>) {
        let mut infer = OldInfer::new(config);
        infer.check_chunk(chunk);
        infer.ctx.finish()
    }
}

/// Returns seen so far in the function being checked
struct ReturnFrame {
    packs: Vec<TypePack>,
    annotated: Option<TypePack>,
    vararg: TypeId,
}

struct OldInfer<'a> {
    ctx: InferCtx<'a>,
    frames: Vec<ReturnFrame>,
    require_exports: FxHashMap<NodeId, IndexMap<String, AliasDef>>,
}

impl ResolveTypes for OldInfer<'_> {
    fn arena(&mut self) -> &mut TypeArena {
        &mut self.ctx.arena
    }

    fn type_scopes(&mut self) -> &mut TypeScopes {
        &mut self.ctx.type_scopes
    }

    fn report_type_error(&mut self, kind: TypeErrorKind, span: Span) {
        self.ctx.report(kind, span);
    }

    fn typeof_expr(&mut self, expr: &Expr) -> TypeId {
        self.check_expr(expr, None)
    }
}

impl<'a> OldInfer<'a> {
    fn new(config: &SolveConfig<'a>) -> Self {
        Self {
            ctx: InferCtx::new(config),
            frames: Vec::new(),
            require_exports: FxHashMap::default(),
        }
    }

    fn check_chunk(&mut self, chunk: &Chunk) {
        self.frames.push(ReturnFrame {
            packs: Vec::new(),
            annotated: None,
            vararg: TypeId::ANY,
        });
        self.check_block(&chunk.block);
        if let Some(frame) = self.frames.pop() {
            self.ctx.module_type = frame.packs.first().and_then(module_value);
        }
    }

    fn check_block(&mut self, block: &Block) {
        self.ctx.type_scopes.push();
        for (name, exported, def) in self.declare_type_aliases(block) {
            self.ctx.record_alias(&name, exported, def);
        }
        for stat in &block.stats {
            self.check_stat(stat);
        }
        self.ctx.type_scopes.pop();
    }

    fn check_stat(&mut self, stat: &Stat) {
        match &stat.kind {
            StatKind::Local { bindings, values } => {
                let annotations: Vec<Option<TypeId>> = bindings
                    .iter()
                    .map(|b| b.annotation.as_ref().map(|a| self.resolve_annotation(a)))
                    .collect();
                let pack = self.check_expr_list(values, &annotations);

                for (i, binding) in bindings.iter().enumerate() {
                    let value = if values.is_empty() {
                        annotations[i].unwrap_or_else(|| self.ctx.arena.fresh(self.ctx.level))
                    } else {
                        pack.get(i)
                    };
                    let ty = match annotations[i] {
                        Some(annotated) => {
                            if !values.is_empty() {
                                let span = value_span(values, i, stat.span);
                                self.ctx.unify(value, annotated, span);
                            }
                            annotated
                        }
                        None => value,
                    };
                    self.ctx.record_binding(binding.id, ty);

                    if let Some(exports) = values.get(i).and_then(|v| self.require_exports.remove(&v.id)) {
                        self.ctx.type_scopes.define_module(&binding.name, exports);
                    }
                }
            }
            StatKind::LocalFunction { binding, func } => {
                let placeholder = self.ctx.arena.fresh(self.ctx.level + 1);
                self.ctx.record_binding(binding.id, placeholder);
                let ty = self.check_function(func, None, None);
                self.ctx.arena.bind(placeholder, ty);
                self.ctx.record_binding(binding.id, ty);
            }
            StatKind::Function { target, func } => self.check_function_stat(target, func),
            StatKind::Assign { targets, values } => {
                let expected: Vec<Option<TypeId>> = targets.iter().map(|t| self.lvalue_type(t)).collect();
                let pack = self.check_expr_list(values, &expected);
                for (i, target) in targets.iter().enumerate() {
                    let span = value_span(values, i, stat.span);
                    self.assign(target, pack.get(i), span);
                }
            }
            StatKind::CompoundAssign { op, target, value } => {
                let current = self.check_expr(target, None);
                let rhs = self.check_expr(value, None);
                let result = self.ctx.binary_type(*op, current, rhs, stat.span);
                self.assign(target, result, value.span);
            }
            StatKind::Call(expr) => {
                self.check_expr(expr, None);
            }
            StatKind::If { clauses, else_block } => {
                for (condition, body) in clauses {
                    self.check_expr(condition, None);
                    self.with_refinements(condition, |this| this.check_block(body));
                }
                if let Some(body) = else_block {
                    self.check_block(body);
                }
            }
            StatKind::While { condition, body } => {
                self.check_expr(condition, None);
                self.with_refinements(condition, |this| this.check_block(body));
            }
            StatKind::Repeat { body, condition } => {
                self.check_block(body);
                self.check_expr(condition, None);
            }
            StatKind::NumericFor { var, start, end, step, body } => {
                for bound in [Some(start), Some(end), step.as_ref()].into_iter().flatten() {
                    let ty = self.check_expr(bound, None);
                    self.ctx.unify(ty, TypeId::NUMBER, bound.span);
                }
                let ty = match &var.annotation {
                    Some(annotation) => self.resolve_annotation(annotation),
                    None => TypeId::NUMBER,
                };
                self.ctx.record_binding(var.id, ty);
                self.check_block(body);
            }
            StatKind::GenericFor { vars, values, body } => {
                let pack = self.check_expr_list(values, &[]);
                let mut iterated = pack.head.clone();
                if let Some(tail) = pack.tail {
                    iterated.resize(iterated.len().max(3), tail);
                }
                let types = self.ctx.iterate_types(&iterated, vars.len(), stat.span);
                for (var, ty) in vars.iter().zip(types) {
                    let ty = match &var.annotation {
                        Some(annotation) => {
                            let annotated = self.resolve_annotation(annotation);
                            self.ctx.unify(ty, annotated, var.span);
                            annotated
                        }
                        None => ty,
                    };
                    self.ctx.record_binding(var.id, ty);
                }
                self.check_block(body);
            }
            StatKind::Do(body) => self.check_block(body),
            StatKind::Break | StatKind::Continue | StatKind::TypeAlias { .. } => {}
            StatKind::Return(values) => {
                let expected: Vec<Option<TypeId>> = match self.frames.last().and_then(|f| f.annotated.as_ref()) {
                    Some(annotated) => (0..values.len()).map(|i| Some(annotated.get(i))).collect(),
                    None => Vec::new(),
                };
                let pack = self.check_expr_list(values, &expected);
                let annotated = self.frames.last().and_then(|f| f.annotated.clone());
                if let Some(annotated) = annotated {
                    for (i, &wanted) in annotated.head.iter().enumerate() {
                        let span = value_span(values, i, stat.span);
                        self.ctx.unify(pack.get(i), wanted, span);
                    }
                }
                if let Some(frame) = self.frames.last_mut() {
                    frame.packs.push(pack);
                }
            }
            StatKind::Error { exprs } => {
                for expr in exprs {
                    self.check_expr(expr, None);
                }
            }
        }
    }

    fn check_function_stat(&mut self, target: &Expr, func: &FunctionBody) {
        match &target.kind {
            ExprKind::Global(name) => {
                let placeholder = self.ctx.arena.fresh(self.ctx.level + 1);
                if !self.ctx.globals.contains_key(name) {
                    self.ctx.define_global(name, placeholder);
                }
                let ty = self.check_function(func, None, None);
                self.ctx.arena.bind(placeholder, ty);
                self.ctx.define_global(name, ty);
                self.ctx.record_expr(target.id, ty);
            }
            ExprKind::Local { binding, .. } => {
                let ty = self.check_function(func, None, None);
                let declared = self.ctx.binding_type(*binding);
                self.ctx.unify(ty, declared, target.span);
                self.ctx.record_expr(target.id, ty);
            }
            ExprKind::IndexName { object, name, is_method, .. } => {
                let object_ty = self.check_expr(object, None);
                let self_ty = is_method.then_some(object_ty);
                let ty = self.check_function(func, self_ty, None);
                self.ctx.assign_prop(object_ty, name, ty, target.span);
                self.ctx.record_expr(target.id, ty);
            }
            _ => {
                self.check_expr(target, None);
                self.check_function(func, None, None);
            }
        }
    }

    /// Declared type of an assignment target, used as the expected type of
    /// the assigned value
    fn lvalue_type(&mut self, target: &Expr) -> Option<TypeId> {
        match &target.kind {
            ExprKind::Local { binding, .. } => self.ctx.binding_types.get(binding).copied(),
            ExprKind::Global(name) => self.ctx.globals.get(name).map(|p| p.ty),
            _ => None,
        }
    }

    fn assign(&mut self, target: &Expr, value: TypeId, span: Span) {
        match &target.kind {
            ExprKind::Local { binding, .. } => {
                let declared = self.ctx.binding_types.get(binding).copied().unwrap_or(TypeId::ANY);
                self.ctx.unify(value, declared, span);
                self.ctx.record_expr(target.id, declared);
            }
            ExprKind::Global(name) => {
                self.ctx.assign_global(name, value, target.span);
                self.ctx.record_expr(target.id, value);
            }
            ExprKind::IndexName { object, name, .. } => {
                let object_ty = self.check_expr(object, None);
                if !name.is_empty() {
                    self.ctx.assign_prop(object_ty, name, value, target.span);
                }
                self.ctx.record_expr(target.id, value);
            }
            ExprKind::IndexExpr { object, index } => {
                let object_ty = self.check_expr(object, None);
                let key = self.check_expr(index, None);
                match &index.kind {
                    ExprKind::String(name) => self.ctx.assign_prop(object_ty, name, value, target.span),
                    _ => self.ctx.assign_index(object_ty, key, value, target.span),
                }
                self.ctx.record_expr(target.id, value);
            }
            _ => {
                self.check_expr(target, None);
            }
        }
    }

    fn with_refinements(&mut self, condition: &Expr, f: impl FnOnce(&mut Self)) {
        let mut refined = FxHashMap::default();
        for binding in truthy_refinements(condition) {
            let current = self.ctx.binding_type(binding);
            refined.insert(binding, self.ctx.arena.strip_nil(current));
        }
        self.ctx.push_refinements(refined);
        f(self);
        self.ctx.pop_refinements();
    }

    fn check_expr(&mut self, expr: &Expr, expected: Option<TypeId>) -> TypeId {
        let ty = self.infer_expr(expr, expected);
        self.ctx.record_expr(expr.id, ty);
        ty
    }

    fn infer_expr(&mut self, expr: &Expr, expected: Option<TypeId>) -> TypeId {
        match &expr.kind {
            ExprKind::Nil | ExprKind::Bool(_) | ExprKind::Number(_) | ExprKind::String(_) => {
                self.ctx.literal_type(expr, expected)
            }
            ExprKind::Varargs => self.frames.last().map_or(TypeId::ANY, |f| f.vararg),
            ExprKind::Local { binding, .. } => self.ctx.binding_type(*binding),
            ExprKind::Global(name) => self.ctx.global_type(name, expr.span),
            ExprKind::Group(inner) => self.check_expr(inner, expected),
            ExprKind::Function(body) => self.check_function(body, None, expected),
            ExprKind::Table(items) => self.check_table(items, expected),
            ExprKind::Call { .. } => self.check_call(expr).first(),
            ExprKind::IndexName { object, name, .. } => {
                let object_ty = self.check_expr(object, None);
                if name.is_empty() {
                    return TypeId::ERROR;
                }
                self.ctx.index_type(object_ty, name, expr.span)
            }
            ExprKind::IndexExpr { object, index } => {
                let object_ty = self.check_expr(object, None);
                let key = self.check_expr(index, None);
                match &index.kind {
                    ExprKind::String(name) => self.ctx.index_type(object_ty, name, expr.span),
                    _ => self.ctx.index_expr_type(object_ty, key, expr.span),
                }
            }
            ExprKind::Unary { op, operand } => {
                let ty = self.check_expr(operand, None);
                self.ctx.unary_type(*op, ty, expr.span)
            }
            ExprKind::Binary { op, left, right } => {
                let left_ty = self.check_expr(left, None);
                let right_ty = if *op == BinaryOp::And {
                    let mut right_ty = TypeId::ANY;
                    self.with_refinements(left, |this| right_ty = this.check_expr(right, None));
                    right_ty
                } else {
                    let expected = (*op == BinaryOp::Or).then_some(expected).flatten();
                    self.check_expr(right, expected)
                };
                self.ctx.binary_type(*op, left_ty, right_ty, expr.span)
            }
            ExprKind::TypeAssertion { expr: inner, ty } => {
                self.check_expr(inner, None);
                self.resolve_annotation(ty)
            }
            ExprKind::IfElse { condition, then_expr, else_expr } => {
                self.check_expr(condition, None);
                let mut then_ty = TypeId::ANY;
                self.with_refinements(condition, |this| then_ty = this.check_expr(then_expr, expected));
                let else_ty = self.check_expr(else_expr, expected);
                self.ctx.arena.union(vec![then_ty, else_ty])
            }
            ExprKind::Error => TypeId::ERROR,
        }
    }

    /// Values of an expression list; a trailing call or `...` spreads
    fn check_expr_list(&mut self, exprs: &[Expr], expected: &[Option<TypeId>]) -> TypePack {
        let mut pack = TypePack::default();
        for (i, expr) in exprs.iter().enumerate() {
            let expected = expected.get(i).copied().flatten();
            if i + 1 == exprs.len() && expr.is_multi_value() {
                let spread = self.check_expr_pack(expr);
                pack.head.extend(spread.head);
                pack.tail = spread.tail;
            } else {
                pack.head.push(self.check_expr(expr, expected));
            }
        }
        pack
    }

    fn check_expr_pack(&mut self, expr: &Expr) -> TypePack {
        match &expr.kind {
            ExprKind::Call { .. } => {
                let pack = self.check_call(expr);
                self.ctx.record_expr(expr.id, pack.first());
                pack
            }
            ExprKind::Varargs => {
                let ty = self.check_expr(expr, None);
                TypePack::variadic(ty)
            }
            _ => TypePack::new(vec![self.check_expr(expr, None)]),
        }
    }

    fn check_call(&mut self, expr: &Expr) -> TypePack {
        let ExprKind::Call { func, args, .. } = &expr.kind else {
            return TypePack::variadic(TypeId::ANY);
        };

        if let Some((path, _)) = require_path(expr) {
            self.check_expr(func, None);
            for arg in args {
                self.check_expr(arg, None);
            }
            let (ty, exports) = self.ctx.require_type(path, expr.span);
            self.require_exports.insert(expr.id, exports);
            let pack = TypePack::new(vec![ty]);
            self.ctx.call_types.insert(expr.id, pack.clone());
            return pack;
        }

        let mut call_args = CallArgs::default();
        let func_ty = match &func.kind {
            ExprKind::IndexName { object, name, is_method: true, .. } => {
                let object_ty = self.check_expr(object, None);
                let method = if name.is_empty() {
                    TypeId::ERROR
                } else {
                    self.ctx.index_type(object_ty, name, func.span)
                };
                self.ctx.record_expr(func.id, method);
                call_args.types.push(object_ty);
                call_args.spans.push(object.span);
                method
            }
            _ => self.check_expr(func, None),
        };

        let expected_params = self
            .ctx
            .arena
            .as_function(func_ty)
            .filter(|f| f.generics.is_empty())
            .map(|f| f.params.clone());
        let offset = call_args.types.len();
        for (i, arg) in args.iter().enumerate() {
            if i + 1 == args.len() && arg.is_multi_value() {
                let spread = self.check_expr_pack(arg);
                for ty in spread.head {
                    call_args.types.push(ty);
                    call_args.spans.push(arg.span);
                }
                call_args.tail = spread.tail;
            } else {
                let expected = expected_params.as_ref().and_then(|p| {
                    p.head.get(i + offset).copied().or(p.tail)
                });
                let ty = self.check_expr(arg, expected);
                call_args.types.push(ty);
                call_args.spans.push(arg.span);
            }
        }

        let callee = match &func.kind {
            ExprKind::Global(name) => Some(name.as_str()),
            _ => None,
        };
        let pack = self.ctx.call_type(func_ty, &call_args, expr.span, callee);
        self.ctx.call_types.insert(expr.id, pack.clone());
        pack
    }

    fn check_function(&mut self, body: &FunctionBody, self_ty: Option<TypeId>, expected: Option<TypeId>) -> TypeId {
        self.ctx.level += 1;
        let level = self.ctx.level;
        self.ctx.type_scopes.push();
        let generics = self.declare_generics(&body.generics);
        let expected = expected
            .and_then(|e| self.ctx.arena.as_function(e))
            .filter(|f| f.generics.is_empty())
            .cloned();

        let mut params = Vec::new();
        let mut param_names = Vec::new();
        if let Some(binding) = &body.self_binding {
            let ty = self_ty.unwrap_or_else(|| self.ctx.arena.fresh(level));
            self.ctx.record_binding(binding.id, ty);
            params.push(ty);
            param_names.push(Some("self".to_string()));
        }
        let offset = params.len();
        for (i, param) in body.params.iter().enumerate() {
            let ty = match &param.annotation {
                Some(annotation) => self.resolve_annotation(annotation),
                None => match expected.as_ref().and_then(|f| f.params.head.get(i + offset).copied()) {
                    Some(ty) => ty,
                    None if self.ctx.strict() => self.ctx.arena.fresh(level),
                    None => TypeId::ANY,
                },
            };
            self.ctx.record_binding(param.id, ty);
            params.push(ty);
            param_names.push(Some(param.name.clone()));
        }
        let vararg = body.vararg.as_ref().map(|v| match &v.annotation {
            Some(annotation) => self.resolve_annotation(annotation),
            None => TypeId::ANY,
        });
        let annotated = body.return_annotation.as_ref().map(|r| self.resolve_return_pack(r));

        self.frames.push(ReturnFrame {
            packs: Vec::new(),
            annotated: annotated.clone(),
            vararg: vararg.unwrap_or(TypeId::ANY),
        });
        self.check_block(&body.body);
        let frame = self.frames.pop();
        self.ctx.type_scopes.pop();

        let returns = match annotated {
            Some(pack) => pack,
            None => {
                let packs = frame.map(|f| f.packs).unwrap_or_default();
                merge_return_packs(&mut self.ctx.arena, &packs)
            }
        };
        let func = self.ctx.arena.function(FunctionType {
            generics,
            params: TypePack { head: params, tail: vararg },
            param_names,
            returns,
        });
        generalize(&mut self.ctx.arena, func, level);
        self.ctx.level -= 1;
        func
    }

    fn check_table(&mut self, items: &[TableItem], expected: Option<TypeId>) -> TypeId {
        let expected = expected.and_then(|e| self.ctx.arena.as_table(e)).cloned();
        let mut table = TableType::new(TableState::Unsealed);
        let mut elements = Vec::new();
        let mut keys = Vec::new();
        let mut values = Vec::new();

        for (i, item) in items.iter().enumerate() {
            match item {
                TableItem::Positional(value) => {
                    if i + 1 == items.len() && value.is_multi_value() {
                        let spread = self.check_expr_pack(value);
                        elements.extend(spread.head);
                        elements.extend(spread.tail);
                    } else {
                        let wanted = expected.as_ref().and_then(|t| t.indexer).map(|(_, v)| v);
                        elements.push(self.check_expr(value, wanted));
                    }
                }
                TableItem::Named { name, value, .. } => {
                    let wanted = expected.as_ref().and_then(|t| t.props.get(name)).map(|p| p.ty);
                    let ty = self.check_expr(value, wanted);
                    table.props.insert(name.clone(), Property::new(ty));
                }
                TableItem::Keyed { key, value } => {
                    let key_ty = self.check_expr(key, None);
                    if let ExprKind::String(name) = &key.kind {
                        let wanted = expected.as_ref().and_then(|t| t.props.get(name)).map(|p| p.ty);
                        let ty = self.check_expr(value, wanted);
                        table.props.insert(name.clone(), Property::new(ty));
                    } else {
                        let wanted = expected.as_ref().and_then(|t| t.indexer).map(|(_, v)| v);
                        keys.push(key_ty);
                        values.push(self.check_expr(value, wanted));
                    }
                }
            }
        }

        if !elements.is_empty() {
            keys.push(TypeId::NUMBER);
            values.extend(elements);
        }
        if !keys.is_empty() {
            let key = self.ctx.arena.union(keys);
            let value = self.ctx.arena.union(values);
            table.indexer = Some((key, value));
        }
        self.ctx.arena.table(table)
    }
}

/// Span to blame for the `i`th assigned value
fn value_span(values: &[Expr], i: usize, fallback: Span) -> Span {
    values
        .get(i)
        .or_else(|| values.last())
        .map_or(fallback, |v| v.span)
}
