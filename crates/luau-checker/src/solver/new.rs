//! Constraint generation followed by a worklist solver
//!
//! Generation walks the chunk once, giving every expression a type. Results
//! that depend on other results (calls, property reads, operators, function
//! signatures) start out blocked and get a constraint that fills them in.
//! The solver dispatches constraints whose inputs are no longer blocked;
//! when nothing can move it forces the oldest function definition, then any
//! constraint, defaulting whatever is still blocked.

use std::ops::Range;

use indexmap::IndexMap;
use luau_ast::{
    BinaryOp, Block, Chunk, Expr, ExprKind, FunctionBody, NodeId, Span, Stat, StatKind, TableItem, UnaryOp,
};
use rustc_hash::{FxHashMap, FxHashSet};

use super::{merge_return_packs, module_value, Solver};
use crate::ctx::{truthy_refinements, CallArgs, InferCtx, SolveConfig};
use crate::error::{TypeError, TypeErrorKind};
use crate::graph::TypeGraph;
use crate::instantiate::collect_frees;
use crate::requires::require_path;
use crate::scope::{AliasDef, ResolveTypes, TypeScopes};
use crate::types::*;

pub struct NewSolver;

impl Solver for NewSolver {
    fn name(&self) -> &'static str {
        "new"
    }

    fn check(&self, chunk: &Chunk, config: &SolveConfig<'_>) -> (TypeGraph, Vec<TypeError>) {
        let mut infer = NewInfer::new(config, chunk.span);
        infer.generate_chunk(chunk);
        infer.solve();
        infer.finish_module();
        infer.ctx.finish()
    }
}

type PackSlot = usize;

/// Values of an expression list: one type per plain expression, plus the
/// pack of a trailing call or `...` with its first value
#[derive(Debug, Clone, Default)]
struct Values {
    head: Vec<TypeId>,
    spread: Option<(PackSlot, TypeId)>,
}

#[derive(Debug, Clone)]
enum Constraint {
    Subtype {
        sub: TypeId,
        sup: TypeId,
        span: Span,
    },
    Call {
        func: TypeId,
        args: Vec<TypeId>,
        spans: Vec<Span>,
        spread: Option<(PackSlot, Span)>,
        span: Span,
        node: NodeId,
        callee: Option<String>,
        result: TypeId,
        pack: PackSlot,
    },
    Property {
        object: TypeId,
        key: String,
        span: Span,
        result: TypeId,
    },
    Index {
        object: TypeId,
        key: TypeId,
        span: Span,
        result: TypeId,
    },
    AssignProp {
        object: TypeId,
        key: String,
        value: TypeId,
        span: Span,
    },
    AssignIndex {
        object: TypeId,
        key: TypeId,
        value: TypeId,
        span: Span,
    },
    AssignGlobal {
        name: String,
        value: TypeId,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: TypeId,
        right: TypeId,
        span: Span,
        result: TypeId,
    },
    Unary {
        op: UnaryOp,
        operand: TypeId,
        span: Span,
        result: TypeId,
    },
    FunctionDef {
        result: TypeId,
        generics: Vec<TypeId>,
        params: TypePack,
        param_names: Vec<Option<String>>,
        annotated: Option<TypePack>,
        returns: Vec<Values>,
        /// Constraints generated from the body
        body: Range<usize>,
        level: u32,
    },
    Unpack {
        pack: PackSlot,
        index: usize,
        result: TypeId,
    },
    Iterate {
        values: Values,
        targets: Vec<TypeId>,
        span: Span,
    },
    Refine {
        source: TypeId,
        result: TypeId,
    },
}

struct FunctionFrame {
    returns: Vec<Values>,
    annotated: Option<TypePack>,
    vararg: TypeId,
}

struct NewInfer<'a> {
    ctx: InferCtx<'a>,
    /// `None` once dispatched
    constraints: Vec<Option<Constraint>>,
    packs: Vec<Option<TypePack>>,
    frames: Vec<FunctionFrame>,
    module_returns: Vec<Values>,
    predeclared: FxHashMap<NodeId, TypeId>,
    require_exports: FxHashMap<NodeId, IndexMap<String, AliasDef>>,
    chunk_span: Span,
}

impl ResolveTypes for NewInfer<'_> {
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
        self.gen_expr(expr, None)
    }
}

impl<'a> NewInfer<'a> {
    fn new(config: &SolveConfig<'a>, chunk_span: Span) -> Self {
        Self {
            ctx: InferCtx::new(config),
            constraints: Vec::new(),
            packs: Vec::new(),
            frames: Vec::new(),
            module_returns: Vec::new(),
            predeclared: FxHashMap::default(),
            require_exports: FxHashMap::default(),
            chunk_span,
        }
    }

    fn push(&mut self, constraint: Constraint) {
        self.constraints.push(Some(constraint));
    }

    fn blocked(&mut self) -> TypeId {
        self.ctx.arena.blocked()
    }

    fn new_pack(&mut self, pack: Option<TypePack>) -> PackSlot {
        self.packs.push(pack);
        self.packs.len() - 1
    }

    // ---- generation ----

    fn generate_chunk(&mut self, chunk: &Chunk) {
        // global functions may be called before their definition runs
        for stat in &chunk.block.stats {
            if let StatKind::Function { target, .. } = &stat.kind {
                if let ExprKind::Global(name) = &target.kind {
                    let placeholder = self.blocked();
                    self.ctx.define_global(name, placeholder);
                    self.predeclared.insert(target.id, placeholder);
                }
            }
        }

        self.frames.push(FunctionFrame {
            returns: Vec::new(),
            annotated: None,
            vararg: TypeId::ANY,
        });
        self.gen_block(&chunk.block);
        if let Some(frame) = self.frames.pop() {
            self.module_returns = frame.returns;
        }
        tracing::trace!(constraints = self.constraints.len(), "generated constraints");
    }

    fn gen_block(&mut self, block: &Block) {
        self.ctx.type_scopes.push();
        for (name, exported, def) in self.declare_type_aliases(block) {
            self.ctx.record_alias(&name, exported, def);
        }
        for stat in &block.stats {
            self.gen_stat(stat);
        }
        self.ctx.type_scopes.pop();
    }

    fn gen_stat(&mut self, stat: &Stat) {
        match &stat.kind {
            StatKind::Local { bindings, values } => {
                let annotations: Vec<Option<TypeId>> = bindings
                    .iter()
                    .map(|b| b.annotation.as_ref().map(|a| self.resolve_annotation(a)))
                    .collect();
                let list = self.gen_expr_list(values, &annotations);

                for (i, binding) in bindings.iter().enumerate() {
                    let value = if values.is_empty() {
                        annotations[i].unwrap_or_else(|| self.ctx.arena.fresh(self.ctx.level))
                    } else {
                        self.value_at(&list, i)
                    };
                    let ty = match annotations[i] {
                        Some(annotated) => {
                            if !values.is_empty() {
                                let span = value_span(values, i, stat.span);
                                self.push(Constraint::Subtype { sub: value, sup: annotated, span });
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
                let result = self.blocked();
                self.ctx.record_binding(binding.id, result);
                self.gen_function(func, None, result);
            }
            StatKind::Function { target, func } => self.gen_function_stat(target, func),
            StatKind::Assign { targets, values } => {
                let expected: Vec<Option<TypeId>> = targets
                    .iter()
                    .map(|t| match &t.kind {
                        ExprKind::Local { binding, .. } => self.ctx.binding_types.get(binding).copied(),
                        _ => None,
                    })
                    .collect();
                let list = self.gen_expr_list(values, &expected);
                for (i, target) in targets.iter().enumerate() {
                    let value = self.value_at(&list, i);
                    let span = value_span(values, i, stat.span);
                    self.gen_assign(target, value, span);
                }
            }
            StatKind::CompoundAssign { op, target, value } => {
                let current = self.gen_expr(target, None);
                let rhs = self.gen_expr(value, None);
                let result = self.blocked();
                self.push(Constraint::Binary { op: *op, left: current, right: rhs, span: stat.span, result });
                if let ExprKind::Local { binding, .. } = &target.kind {
                    let declared = self.ctx.binding_type(*binding);
                    self.push(Constraint::Subtype { sub: result, sup: declared, span: value.span });
                }
            }
            StatKind::Call(expr) => {
                self.gen_expr(expr, None);
            }
            StatKind::If { clauses, else_block } => {
                for (condition, body) in clauses {
                    self.gen_expr(condition, None);
                    self.with_refinements(condition, |this| this.gen_block(body));
                }
                if let Some(body) = else_block {
                    self.gen_block(body);
                }
            }
            StatKind::While { condition, body } => {
                self.gen_expr(condition, None);
                self.with_refinements(condition, |this| this.gen_block(body));
            }
            StatKind::Repeat { body, condition } => {
                self.gen_block(body);
                self.gen_expr(condition, None);
            }
            StatKind::NumericFor { var, start, end, step, body } => {
                for bound in [Some(start), Some(end), step.as_ref()].into_iter().flatten() {
                    let ty = self.gen_expr(bound, None);
                    self.push(Constraint::Subtype { sub: ty, sup: TypeId::NUMBER, span: bound.span });
                }
                let ty = match &var.annotation {
                    Some(annotation) => self.resolve_annotation(annotation),
                    None => TypeId::NUMBER,
                };
                self.ctx.record_binding(var.id, ty);
                self.gen_block(body);
            }
            StatKind::GenericFor { vars, values, body } => {
                let list = self.gen_expr_list(values, &[]);
                let targets: Vec<TypeId> = vars.iter().map(|_| self.ctx.arena.blocked()).collect();
                self.push(Constraint::Iterate { values: list, targets: targets.clone(), span: stat.span });
                for (var, target) in vars.iter().zip(targets) {
                    let ty = match &var.annotation {
                        Some(annotation) => {
                            let annotated = self.resolve_annotation(annotation);
                            self.push(Constraint::Subtype { sub: target, sup: annotated, span: var.span });
                            annotated
                        }
                        None => target,
                    };
                    self.ctx.record_binding(var.id, ty);
                }
                self.gen_block(body);
            }
            StatKind::Do(body) => self.gen_block(body),
            StatKind::Break | StatKind::Continue | StatKind::TypeAlias { .. } => {}
            StatKind::Return(values) => {
                let annotated = self.frames.last().and_then(|f| f.annotated.clone());
                let expected: Vec<Option<TypeId>> = match &annotated {
                    Some(pack) => (0..values.len()).map(|i| Some(pack.get(i))).collect(),
                    None => Vec::new(),
                };
                let list = self.gen_expr_list(values, &expected);
                if let Some(pack) = annotated {
                    for (i, &wanted) in pack.head.iter().enumerate() {
                        let value = self.value_at(&list, i);
                        let span = value_span(values, i, stat.span);
                        self.push(Constraint::Subtype { sub: value, sup: wanted, span });
                    }
                }
                if let Some(frame) = self.frames.last_mut() {
                    frame.returns.push(list);
                }
            }
            StatKind::Error { exprs } => {
                for expr in exprs {
                    self.gen_expr(expr, None);
                }
            }
        }
    }

    fn gen_function_stat(&mut self, target: &Expr, func: &FunctionBody) {
        match &target.kind {
            ExprKind::Global(name) => {
                let result = match self.predeclared.get(&target.id) {
                    Some(&placeholder) => placeholder,
                    None => {
                        let placeholder = self.blocked();
                        self.ctx.define_global(name, placeholder);
                        placeholder
                    }
                };
                self.ctx.record_expr(target.id, result);
                self.gen_function(func, None, result);
            }
            ExprKind::Local { binding, .. } => {
                let result = self.blocked();
                self.ctx.record_expr(target.id, result);
                let declared = self.ctx.binding_type(*binding);
                self.gen_function(func, None, result);
                self.push(Constraint::Subtype { sub: result, sup: declared, span: target.span });
            }
            ExprKind::IndexName { object, name, is_method, .. } => {
                let object_ty = self.gen_expr(object, None);
                let result = self.blocked();
                self.ctx.record_expr(target.id, result);
                // the member exists before the body is solved so methods can
                // call each other through `self`
                if self.ctx.arena.is_blocked(object_ty) {
                    self.push(Constraint::AssignProp {
                        object: object_ty,
                        key: name.clone(),
                        value: result,
                        span: target.span,
                    });
                } else {
                    self.ctx.assign_prop(object_ty, name, result, target.span);
                }
                self.gen_function(func, is_method.then_some(object_ty), result);
            }
            _ => {
                self.gen_expr(target, None);
                let result = self.blocked();
                self.gen_function(func, None, result);
            }
        }
    }

    fn gen_assign(&mut self, target: &Expr, value: TypeId, span: Span) {
        match &target.kind {
            ExprKind::Local { binding, .. } => {
                let declared = self.ctx.binding_types.get(binding).copied().unwrap_or(TypeId::ANY);
                self.push(Constraint::Subtype { sub: value, sup: declared, span });
                self.ctx.record_expr(target.id, declared);
            }
            ExprKind::Global(name) => {
                // later reads in this chunk must already see the global
                if !self.ctx.arena.is_blocked(value) {
                    self.ctx.assign_global(name, value, target.span);
                } else {
                    if !self.ctx.strict() && !self.ctx.globals.contains_key(name) {
                        self.ctx.define_global(name, value);
                    }
                    self.push(Constraint::AssignGlobal { name: name.clone(), value, span: target.span });
                }
                self.ctx.record_expr(target.id, value);
            }
            ExprKind::IndexName { object, name, .. } => {
                let object_ty = self.gen_expr(object, None);
                if !name.is_empty() {
                    self.push(Constraint::AssignProp {
                        object: object_ty,
                        key: name.clone(),
                        value,
                        span: target.span,
                    });
                }
                self.ctx.record_expr(target.id, value);
            }
            ExprKind::IndexExpr { object, index } => {
                let object_ty = self.gen_expr(object, None);
                let key = self.gen_expr(index, None);
                let constraint = match &index.kind {
                    ExprKind::String(name) => Constraint::AssignProp {
                        object: object_ty,
                        key: name.clone(),
                        value,
                        span: target.span,
                    },
                    _ => Constraint::AssignIndex { object: object_ty, key, value, span: target.span },
                };
                self.push(constraint);
                self.ctx.record_expr(target.id, value);
            }
            _ => {
                self.gen_expr(target, None);
            }
        }
    }

    fn with_refinements(&mut self, condition: &Expr, f: impl FnOnce(&mut Self)) {
        let mut refined = FxHashMap::default();
        for binding in truthy_refinements(condition) {
            let source = self.ctx.binding_type(binding);
            let result = self.blocked();
            self.push(Constraint::Refine { source, result });
            refined.insert(binding, result);
        }
        self.ctx.push_refinements(refined);
        f(self);
        self.ctx.pop_refinements();
    }

    /// The `i`th value of an expression list
    fn value_at(&mut self, list: &Values, i: usize) -> TypeId {
        if let Some(&ty) = list.head.get(i) {
            return ty;
        }
        match list.spread {
            Some((_, first)) if i == list.head.len() => first,
            Some((pack, _)) => {
                let result = self.blocked();
                let index = i - list.head.len();
                self.push(Constraint::Unpack { pack, index, result });
                result
            }
            None => TypeId::NIL,
        }
    }

    fn gen_expr(&mut self, expr: &Expr, expected: Option<TypeId>) -> TypeId {
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
            ExprKind::Group(inner) => self.gen_expr(inner, expected),
            ExprKind::Function(body) => {
                let result = self.blocked();
                self.gen_function(body, None, result);
                result
            }
            ExprKind::Table(items) => self.gen_table(items, expected),
            ExprKind::Call { .. } => self.gen_call(expr).0,
            ExprKind::IndexName { object, name, .. } => {
                let object_ty = self.gen_expr(object, None);
                if name.is_empty() {
                    return TypeId::ERROR;
                }
                let result = self.blocked();
                self.push(Constraint::Property { object: object_ty, key: name.clone(), span: expr.span, result });
                result
            }
            ExprKind::IndexExpr { object, index } => {
                let object_ty = self.gen_expr(object, None);
                let key = self.gen_expr(index, None);
                let result = self.blocked();
                let constraint = match &index.kind {
                    ExprKind::String(name) => Constraint::Property {
                        object: object_ty,
                        key: name.clone(),
                        span: expr.span,
                        result,
                    },
                    _ => Constraint::Index { object: object_ty, key, span: expr.span, result },
                };
                self.push(constraint);
                result
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.gen_expr(operand, None);
                let result = self.blocked();
                self.push(Constraint::Unary { op: *op, operand, span: expr.span, result });
                result
            }
            ExprKind::Binary { op, left, right } => {
                let left_ty = self.gen_expr(left, None);
                let right_ty = if *op == BinaryOp::And {
                    let mut right_ty = TypeId::ANY;
                    self.with_refinements(left, |this| right_ty = this.gen_expr(right, None));
                    right_ty
                } else {
                    let expected = (*op == BinaryOp::Or).then_some(expected).flatten();
                    self.gen_expr(right, expected)
                };
                let result = self.blocked();
                self.push(Constraint::Binary { op: *op, left: left_ty, right: right_ty, span: expr.span, result });
                result
            }
            ExprKind::TypeAssertion { expr: inner, ty } => {
                self.gen_expr(inner, None);
                self.resolve_annotation(ty)
            }
            ExprKind::IfElse { condition, then_expr, else_expr } => {
                self.gen_expr(condition, None);
                let mut then_ty = TypeId::ANY;
                self.with_refinements(condition, |this| then_ty = this.gen_expr(then_expr, expected));
                let else_ty = self.gen_expr(else_expr, expected);
                self.ctx.arena.union(vec![then_ty, else_ty])
            }
            ExprKind::Error => TypeId::ERROR,
        }
    }

    fn gen_expr_list(&mut self, exprs: &[Expr], expected: &[Option<TypeId>]) -> Values {
        let mut list = Values::default();
        for (i, expr) in exprs.iter().enumerate() {
            if i + 1 == exprs.len() && expr.is_multi_value() {
                list.spread = Some(self.gen_spread(expr));
            } else {
                let expected = expected.get(i).copied().flatten();
                list.head.push(self.gen_expr(expr, expected));
            }
        }
        list
    }

    /// Pack slot and first value of a call or `...`
    fn gen_spread(&mut self, expr: &Expr) -> (PackSlot, TypeId) {
        match &expr.kind {
            ExprKind::Call { .. } => {
                let (first, pack) = self.gen_call(expr);
                self.ctx.record_expr(expr.id, first);
                (pack, first)
            }
            _ => {
                let ty = self.gen_expr(expr, None);
                let pack = self.new_pack(Some(TypePack::variadic(ty)));
                (pack, ty)
            }
        }
    }

    fn gen_call(&mut self, expr: &Expr) -> (TypeId, PackSlot) {
        let ExprKind::Call { func, args, .. } = &expr.kind else {
            let pack = self.new_pack(Some(TypePack::variadic(TypeId::ANY)));
            return (TypeId::ANY, pack);
        };

        if let Some((path, _)) = require_path(expr) {
            self.gen_expr(func, None);
            for arg in args {
                self.gen_expr(arg, None);
            }
            let (ty, exports) = self.ctx.require_type(path, expr.span);
            self.require_exports.insert(expr.id, exports);
            let pack = TypePack::new(vec![ty]);
            self.ctx.call_types.insert(expr.id, pack.clone());
            return (ty, self.new_pack(Some(pack)));
        }

        let mut types = Vec::new();
        let mut spans = Vec::new();
        let func_ty = match &func.kind {
            ExprKind::IndexName { object, name, is_method: true, .. } => {
                let object_ty = self.gen_expr(object, None);
                let method = if name.is_empty() {
                    TypeId::ERROR
                } else {
                    let result = self.blocked();
                    self.push(Constraint::Property {
                        object: object_ty,
                        key: name.clone(),
                        span: func.span,
                        result,
                    });
                    result
                };
                self.ctx.record_expr(func.id, method);
                types.push(object_ty);
                spans.push(object.span);
                method
            }
            _ => self.gen_expr(func, None),
        };

        let mut spread = None;
        for (i, arg) in args.iter().enumerate() {
            if i + 1 == args.len() && arg.is_multi_value() {
                let (pack, _) = self.gen_spread(arg);
                spread = Some((pack, arg.span));
            } else {
                types.push(self.gen_expr(arg, None));
                spans.push(arg.span);
            }
        }

        let callee = match &func.kind {
            ExprKind::Global(name) => Some(name.clone()),
            _ => None,
        };
        let result = self.blocked();
        let pack = self.new_pack(None);
        self.push(Constraint::Call {
            func: func_ty,
            args: types,
            spans,
            spread,
            span: expr.span,
            node: expr.id,
            callee,
            result,
            pack,
        });
        (result, pack)
    }

    fn gen_function(&mut self, body: &FunctionBody, self_ty: Option<TypeId>, result: TypeId) {
        self.ctx.level += 1;
        let level = self.ctx.level;
        self.ctx.type_scopes.push();
        let generics = self.declare_generics(&body.generics);

        let mut params = Vec::new();
        let mut param_names = Vec::new();
        if let Some(binding) = &body.self_binding {
            let ty = self_ty.unwrap_or_else(|| self.ctx.arena.fresh(level));
            self.ctx.record_binding(binding.id, ty);
            params.push(ty);
            param_names.push(Some("self".to_string()));
        }
        for param in &body.params {
            let ty = match &param.annotation {
                Some(annotation) => self.resolve_annotation(annotation),
                None if self.ctx.strict() => self.ctx.arena.fresh(level),
                None => TypeId::ANY,
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

        self.frames.push(FunctionFrame {
            returns: Vec::new(),
            annotated: annotated.clone(),
            vararg: vararg.unwrap_or(TypeId::ANY),
        });
        let start = self.constraints.len();
        self.gen_block(&body.body);
        let end = self.constraints.len();
        let frame = self.frames.pop();
        self.ctx.type_scopes.pop();

        self.push(Constraint::FunctionDef {
            result,
            generics,
            params: TypePack { head: params, tail: vararg },
            param_names,
            annotated,
            returns: frame.map(|f| f.returns).unwrap_or_default(),
            body: start..end,
            level,
        });
        self.ctx.level -= 1;
    }

    fn gen_table(&mut self, items: &[TableItem], expected: Option<TypeId>) -> TypeId {
        let expected = expected.and_then(|e| self.ctx.arena.as_table(e)).cloned();
        let mut table = TableType::new(TableState::Unsealed);
        let mut keys = Vec::new();
        let mut values = Vec::new();
        let mut elements = Vec::new();

        for (i, item) in items.iter().enumerate() {
            match item {
                TableItem::Positional(value) => {
                    if i + 1 == items.len() && value.is_multi_value() {
                        let (pack, first) = self.gen_spread(value);
                        elements.push(first);
                        let rest = self.blocked();
                        self.push(Constraint::Unpack { pack, index: 1, result: rest });
                        elements.push(rest);
                    } else {
                        let wanted = expected.as_ref().and_then(|t| t.indexer).map(|(_, v)| v);
                        elements.push(self.gen_expr(value, wanted));
                    }
                }
                TableItem::Named { name, value, .. } => {
                    let wanted = expected.as_ref().and_then(|t| t.props.get(name)).map(|p| p.ty);
                    let ty = self.gen_expr(value, wanted);
                    table.props.insert(name.clone(), Property::new(ty));
                }
                TableItem::Keyed { key, value } => {
                    let key_ty = self.gen_expr(key, None);
                    if let ExprKind::String(name) = &key.kind {
                        let wanted = expected.as_ref().and_then(|t| t.props.get(name)).map(|p| p.ty);
                        let ty = self.gen_expr(value, wanted);
                        table.props.insert(name.clone(), Property::new(ty));
                    } else {
                        let wanted = expected.as_ref().and_then(|t| t.indexer).map(|(_, v)| v);
                        keys.push(key_ty);
                        values.push(self.gen_expr(value, wanted));
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

    // ---- solving ----

    fn solve(&mut self) {
        self.ctx.level = 0;
        let mut pending: Vec<usize> = (0..self.constraints.len()).collect();
        let mut iterations = 0usize;

        while !pending.is_empty() {
            iterations += 1;
            if iterations > self.ctx.limits.max_solver_iterations {
                tracing::debug!(remaining = pending.len(), "solver iteration limit reached");
                self.ctx.report_too_complex(self.chunk_span);
                for idx in pending {
                    self.force(idx);
                }
                return;
            }

            let mut progressed = false;
            let mut still_pending = Vec::with_capacity(pending.len());
            for idx in pending {
                if self.is_ready(idx) {
                    self.dispatch(idx, false);
                    progressed = true;
                } else {
                    still_pending.push(idx);
                }
            }
            pending = still_pending;

            if !progressed && !pending.is_empty() {
                let victim = pending
                    .iter()
                    .position(|&i| matches!(self.constraints[i], Some(Constraint::FunctionDef { .. })))
                    .unwrap_or(0);
                let idx = pending.remove(victim);
                tracing::trace!(idx, "forcing stuck constraint");
                self.force(idx);
            }
        }
    }

    fn default_type(&self) -> TypeId {
        if self.ctx.strict() {
            TypeId::UNKNOWN
        } else {
            TypeId::ANY
        }
    }

    /// Types that must be resolved before a constraint can run
    fn inputs(constraint: &Constraint) -> Vec<TypeId> {
        match constraint {
            Constraint::Subtype { sub, sup, .. } => vec![*sub, *sup],
            Constraint::Call { func, args, .. } => {
                let mut inputs = vec![*func];
                inputs.extend(args.iter().copied());
                inputs
            }
            Constraint::Property { object, .. } | Constraint::AssignProp { object, .. } => vec![*object],
            Constraint::Index { object, key, .. } => vec![*object, *key],
            Constraint::AssignIndex { object, .. } => vec![*object],
            Constraint::AssignGlobal { value, .. } => vec![*value],
            Constraint::Binary { left, right, .. } => vec![*left, *right],
            Constraint::Unary { operand, .. } => vec![*operand],
            Constraint::Iterate { values, .. } => values.head.clone(),
            Constraint::Refine { source, .. } => vec![*source],
            Constraint::FunctionDef { .. } | Constraint::Unpack { .. } => Vec::new(),
        }
    }

    /// Packs that must be resolved before a constraint can run
    fn pack_inputs(constraint: &Constraint) -> Vec<PackSlot> {
        match constraint {
            Constraint::Call { spread, .. } => spread.iter().map(|(pack, _)| *pack).collect(),
            Constraint::Unpack { pack, .. } => vec![*pack],
            Constraint::Iterate { values, .. } => values.spread.iter().map(|(pack, _)| *pack).collect(),
            Constraint::FunctionDef { returns, .. } => returns
                .iter()
                .filter_map(|v| v.spread.map(|(pack, _)| pack))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn is_ready(&self, idx: usize) -> bool {
        let Some(constraint) = &self.constraints[idx] else {
            return false;
        };
        if Self::inputs(constraint).into_iter().any(|t| self.ctx.arena.is_blocked(t)) {
            return false;
        }
        if Self::pack_inputs(constraint).into_iter().any(|p| self.packs[p].is_none()) {
            return false;
        }
        match constraint {
            Constraint::FunctionDef { body, .. } => body.clone().all(|i| self.constraints[i].is_none()),
            _ => true,
        }
    }

    fn force(&mut self, idx: usize) {
        let Some(constraint) = &self.constraints[idx] else {
            return;
        };
        let default = self.default_type();
        let inputs = Self::inputs(constraint);
        let packs = Self::pack_inputs(constraint);
        for ty in inputs {
            if self.ctx.arena.is_blocked(ty) {
                self.ctx.arena.bind(ty, default);
            }
        }
        for pack in packs {
            if self.packs[pack].is_none() {
                self.packs[pack] = Some(TypePack::variadic(default));
            }
        }
        self.dispatch(idx, true);
    }

    fn expand(&self, values: &Values) -> TypePack {
        let mut pack = TypePack::new(values.head.clone());
        if let Some((slot, first)) = values.spread {
            match &self.packs[slot] {
                Some(spread) => {
                    pack.head.extend(spread.head.iter().copied());
                    pack.tail = spread.tail;
                }
                None => pack.head.push(first),
            }
        }
        pack
    }

    fn resolve(&mut self, result: TypeId, ty: TypeId) {
        self.ctx.arena.bind(result, ty);
    }

    fn dispatch(&mut self, idx: usize, forced: bool) {
        let Some(constraint) = self.constraints[idx].take() else {
            return;
        };

        match constraint {
            Constraint::Subtype { sub, sup, span } => {
                self.ctx.unify(sub, sup, span);
            }
            Constraint::Call { func, mut args, mut spans, spread, span, node, callee, result, pack } => {
                let mut tail = None;
                if let Some((slot, spread_span)) = spread {
                    if let Some(values) = self.packs[slot].clone() {
                        for ty in values.head {
                            args.push(ty);
                            spans.push(spread_span);
                        }
                        tail = values.tail;
                    }
                }
                let call_args = CallArgs { types: args, spans, tail };
                let returns = self.ctx.call_type(func, &call_args, span, callee.as_deref());
                self.ctx.call_types.insert(node, returns.clone());
                self.resolve(result, returns.first());
                self.packs[pack] = Some(returns);
            }
            Constraint::Property { object, key, span, result } => {
                let ty = self.ctx.index_type(object, &key, span);
                self.resolve(result, ty);
            }
            Constraint::Index { object, key, span, result } => {
                let ty = self.ctx.index_expr_type(object, key, span);
                self.resolve(result, ty);
            }
            Constraint::AssignProp { object, key, value, span } => {
                self.ctx.assign_prop(object, &key, value, span);
            }
            Constraint::AssignIndex { object, key, value, span } => {
                self.ctx.assign_index(object, key, value, span);
            }
            Constraint::AssignGlobal { name, value, span } => {
                self.ctx.assign_global(&name, value, span);
            }
            Constraint::Binary { op, left, right, span, result } => {
                let ty = self.ctx.binary_type(op, left, right, span);
                self.resolve(result, ty);
            }
            Constraint::Unary { op, operand, span, result } => {
                let ty = self.ctx.unary_type(op, operand, span);
                self.resolve(result, ty);
            }
            Constraint::FunctionDef { result, generics, params, param_names, annotated, returns, level, .. } => {
                let returns = match annotated {
                    Some(pack) => pack,
                    None => self.merge_returns(&returns, forced),
                };
                let func = self.ctx.arena.function(FunctionType { generics, params, param_names, returns });
                if self.ctx.strict() {
                    self.default_free_types(func, level);
                }
                self.resolve(result, func);
            }
            Constraint::Unpack { pack, index, result } => {
                let ty = self.packs[pack].as_ref().map_or(TypeId::NIL, |p| p.get(index));
                self.resolve(result, ty);
            }
            Constraint::Iterate { values, targets, span } => {
                let pack = self.expand(&values);
                let mut iterated = pack.head;
                if let Some(tail) = pack.tail {
                    iterated.resize(iterated.len().max(3), tail);
                }
                let types = self.ctx.iterate_types(&iterated, targets.len(), span);
                for (target, ty) in targets.into_iter().zip(types) {
                    self.resolve(target, ty);
                }
            }
            Constraint::Refine { source, result } => {
                let ty = self.ctx.arena.strip_nil(source);
                self.resolve(result, ty);
            }
        }
    }

    /// Return pack of a function from its `return` statements. A forced
    /// definition ignores values that are still blocked.
    fn merge_returns(&mut self, returns: &[Values], forced: bool) -> TypePack {
        let mut packs: Vec<TypePack> = returns.iter().map(|v| self.expand(v)).collect();
        if forced {
            for pack in &mut packs {
                for ty in pack.head.iter_mut().chain(pack.tail.iter_mut()) {
                    if self.ctx.arena.is_blocked(*ty) {
                        *ty = TypeId::NEVER;
                    }
                }
            }
        }
        let mut merged = merge_return_packs(&mut self.ctx.arena, &packs);
        if forced {
            let default = self.default_type();
            for ty in merged.head.iter_mut() {
                if self.ctx.arena.follow(*ty) == TypeId::NEVER {
                    *ty = default;
                }
            }
        }
        merged
    }

    /// Strict code gets `unknown` for parameters nothing constrained
    fn default_free_types(&mut self, func: TypeId, level: u32) {
        let mut frees = Vec::new();
        let mut visited = FxHashSet::default();
        collect_frees(&self.ctx.arena, func, level, &mut frees, &mut visited);
        for free in frees {
            self.ctx.arena.bind(free, TypeId::UNKNOWN);
        }
    }

    fn finish_module(&mut self) {
        let returns = std::mem::take(&mut self.module_returns);
        self.ctx.module_type = returns.first().and_then(|v| module_value(&self.expand(v)));
    }
}

fn value_span(values: &[Expr], i: usize, fallback: Span) -> Span {
    values
        .get(i)
        .or_else(|| values.last())
        .map_or(fallback, |v| v.span)
}
