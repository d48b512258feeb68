//! Typing rules shared by both solvers
//!
//! `InferCtx` owns the arena and the per-node results of one check. The
//! solvers decide *when* a rule runs; the rules themselves (property access,
//! operators, calls, requires, refinements) live here so both strategies
//! agree on what a well-typed program is.

use indexmap::IndexMap;
use luau_ast::{BinaryOp, Expr, ExprKind, NodeId, Span, UnaryOp};
use rustc_hash::FxHashMap;

use crate::builtins::Builtins;
use crate::display::display;
use crate::error::{TypeError, TypeErrorKind};
use crate::graph::{ModuleImport, ModuleImports, TypeGraph};
use crate::instantiate::{instantiate, TypeImporter};
use crate::options::{Limits, Mode};
use crate::scope::{AliasDef, TypeScopes};
use crate::types::*;
use crate::unify::Unifier;

/// Inputs shared by both solver strategies
#[derive(Clone, Copy)]
pub struct SolveConfig<'a> {
    pub mode: Mode,
    pub limits: Limits,
    pub imports: &'a dyn ModuleImports,
}

/// Arguments of one call, already typed
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub types: Vec<TypeId>,
    pub spans: Vec<Span>,
    /// Element type of values spread by a trailing call or `...`
    pub tail: Option<TypeId>,
}

pub struct InferCtx<'a> {
    pub arena: TypeArena,
    pub expr_types: FxHashMap<NodeId, TypeId>,
    pub binding_types: FxHashMap<NodeId, TypeId>,
    pub call_types: FxHashMap<NodeId, TypePack>,
    pub globals: IndexMap<String, Property>,
    pub string_lib: TypeId,
    pub type_scopes: TypeScopes,
    pub type_aliases: IndexMap<String, TypeId>,
    pub exported_types: IndexMap<String, AliasDef>,
    pub module_type: Option<TypeId>,
    pub mode: Mode,
    pub limits: Limits,
    /// Generalization level of the function being checked
    pub level: u32,
    imports: &'a dyn ModuleImports,
    refinements: Vec<FxHashMap<NodeId, TypeId>>,
    errors: Vec<TypeError>,
    too_complex: bool,
}

impl<'a> InferCtx<'a> {
    pub fn new(config: &SolveConfig<'a>) -> Self {
        let mut arena = TypeArena::new();
        let builtins = Builtins::install(&mut arena);
        Self {
            arena,
            expr_types: FxHashMap::default(),
            binding_types: FxHashMap::default(),
            call_types: FxHashMap::default(),
            globals: builtins.globals,
            string_lib: builtins.string_lib,
            type_scopes: TypeScopes::new(),
            type_aliases: IndexMap::new(),
            exported_types: IndexMap::new(),
            module_type: None,
            mode: config.mode,
            limits: config.limits,
            level: 0,
            imports: config.imports,
            refinements: Vec::new(),
            errors: Vec::new(),
            too_complex: false,
        }
    }

    pub fn strict(&self) -> bool {
        self.mode == Mode::Strict
    }

    pub fn report(&mut self, kind: TypeErrorKind, span: Span) {
        let error = TypeError::new(kind, span);
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }

    pub fn report_too_complex(&mut self, span: Span) {
        if !self.too_complex {
            self.too_complex = true;
            self.report(TypeErrorKind::CodeTooComplex, span);
        }
    }

    pub fn display(&self, ty: TypeId) -> String {
        display(&self.arena, ty)
    }

    pub fn record_expr(&mut self, id: NodeId, ty: TypeId) {
        self.expr_types.insert(id, ty);
    }

    pub fn record_binding(&mut self, id: NodeId, ty: TypeId) {
        self.binding_types.insert(id, ty);
    }

    /// Current type of a local, taking active refinements into account
    pub fn binding_type(&self, id: NodeId) -> TypeId {
        self.refinements
            .iter()
            .rev()
            .find_map(|scope| scope.get(&id).copied())
            .or_else(|| self.binding_types.get(&id).copied())
            .unwrap_or(TypeId::ANY)
    }

    pub fn push_refinements(&mut self, refined: FxHashMap<NodeId, TypeId>) {
        self.refinements.push(refined);
    }

    pub fn pop_refinements(&mut self) {
        self.refinements.pop();
    }

    /// Check `sub <: sup`, binding free types; reports a mismatch at `span`
    pub fn unify(&mut self, sub: TypeId, sup: TypeId, span: Span) -> bool {
        let mut unifier = Unifier::new(&mut self.arena, self.limits.max_type_depth);
        let ok = unifier.unify(sub, sup);
        if unifier.too_complex {
            self.report_too_complex(span);
        }
        if !ok {
            let kind = TypeErrorKind::TypeMismatch {
                wanted: self.display(sup),
                given: self.display(sub),
            };
            self.report(kind, span);
        }
        ok
    }

    pub fn is_subtype(&mut self, sub: TypeId, sup: TypeId) -> bool {
        Unifier::new(&mut self.arena, self.limits.max_type_depth).is_subtype(sub, sup)
    }

    /// Type of a string or boolean literal; a singleton only where the
    /// expected type asks for one
    pub fn literal_type(&mut self, expr: &Expr, expected: Option<TypeId>) -> TypeId {
        let wants_singleton = expected.is_some_and(|t| self.mentions_singleton(t));
        match &expr.kind {
            ExprKind::String(value) if wants_singleton => self.arena.string_singleton(value),
            ExprKind::Bool(value) if wants_singleton => self.arena.bool_singleton(*value),
            ExprKind::String(_) => TypeId::STRING,
            ExprKind::Bool(_) => TypeId::BOOLEAN,
            ExprKind::Number(_) => TypeId::NUMBER,
            ExprKind::Nil => TypeId::NIL,
            _ => TypeId::ANY,
        }
    }

    fn mentions_singleton(&self, ty: TypeId) -> bool {
        match self.arena.kind(ty) {
            TypeKind::Singleton(_) => true,
            TypeKind::Union(parts) => parts
                .iter()
                .any(|&p| matches!(self.arena.kind(p), TypeKind::Singleton(_))),
            _ => false,
        }
    }

    pub fn global_type(&mut self, name: &str, span: Span) -> TypeId {
        match self.globals.get(name) {
            Some(prop) => prop.ty,
            None => {
                self.report(TypeErrorKind::UnknownGlobal { name: name.to_string() }, span);
                TypeId::ERROR
            }
        }
    }

    /// `name = value` for a global. Nonstrict code may create globals this way.
    pub fn assign_global(&mut self, name: &str, value: TypeId, span: Span) {
        match self.globals.get(name).map(|p| p.ty) {
            Some(existing) => {
                self.unify(value, existing, span);
            }
            None if self.strict() => {
                self.report(TypeErrorKind::UnknownGlobal { name: name.to_string() }, span);
            }
            None => {
                self.globals.insert(name.to_string(), Property::new(value));
            }
        }
    }

    /// `function name() end` always defines the global
    pub fn define_global(&mut self, name: &str, ty: TypeId) {
        self.globals.insert(name.to_string(), Property::new(ty));
    }

    /// Type of `object.key`
    pub fn index_type(&mut self, object: TypeId, key: &str, span: Span) -> TypeId {
        self.index_type_at(object, key, span, 0)
    }

    fn index_type_at(&mut self, object: TypeId, key: &str, span: Span, depth: usize) -> TypeId {
        let object = self.arena.follow(object);
        if depth > self.limits.max_type_depth {
            self.report_too_complex(span);
            return TypeId::ERROR;
        }

        match self.arena.get(object) {
            TypeKind::Any | TypeKind::Blocked => return TypeId::ANY,
            TypeKind::Error => return TypeId::ERROR,
            TypeKind::Never => return TypeId::NEVER,
            TypeKind::Free { level } => {
                let level = *level;
                let value = self.arena.fresh(level);
                let mut table = TableType::new(TableState::Free);
                table.props.insert(key.to_string(), Property::new(value));
                let table = self.arena.table(table);
                self.arena.bind(object, table);
                return value;
            }
            TypeKind::Primitive(Primitive::String) | TypeKind::Singleton(Singleton::String(_)) => {
                let lib = self.string_lib;
                return self.index_type_at(lib, key, span, depth + 1);
            }
            _ => {}
        }

        if let Some(table) = self.arena.as_table(object) {
            if let Some(prop) = table.props.get(key) {
                return prop.ty;
            }
            let indexer = table.indexer;
            let metatable = table.metatable;
            let state = table.state;

            if let Some((key_ty, value)) = indexer {
                if self.is_subtype(TypeId::STRING, key_ty) {
                    return value;
                }
            }
            if let Some(via) = metatable.and_then(|mt| self.metatable_index(mt)) {
                return self.index_type_at(via, key, span, depth + 1);
            }
            if state == TableState::Free {
                let value = self.arena.fresh(self.level);
                if let Some(table) = self.arena.as_table_mut(object) {
                    table.props.insert(key.to_string(), Property::new(value));
                }
                return value;
            }
            // tables still being built are only policed in strict code
            if state == TableState::Unsealed && !self.strict() {
                return TypeId::ANY;
            }
            let kind = TypeErrorKind::UnknownProperty {
                key: key.to_string(),
                table: self.display(object),
            };
            self.report(kind, span);
            return TypeId::ERROR;
        }

        match self.arena.get(object).clone() {
            TypeKind::Union(parts) => {
                let non_nil: Vec<TypeId> = parts
                    .iter()
                    .copied()
                    .filter(|&p| self.arena.follow(p) != TypeId::NIL)
                    .collect();
                if non_nil.len() < parts.len() && self.strict() {
                    let kind = TypeErrorKind::OptionalValueAccess { ty: self.display(object) };
                    self.report(kind, span);
                }
                let results = non_nil
                    .into_iter()
                    .map(|p| self.index_type_at(p, key, span, depth + 1))
                    .collect();
                self.arena.union(results)
            }
            TypeKind::Intersection(parts) => {
                let found = parts.iter().copied().find(|&p| {
                    self.arena
                        .as_table(p)
                        .is_some_and(|t| t.props.contains_key(key))
                });
                match found {
                    Some(part) => self.index_type_at(part, key, span, depth + 1),
                    None => self.no_such_key(object, key, span),
                }
            }
            _ => self.no_such_key(object, key, span),
        }
    }

    fn no_such_key(&mut self, object: TypeId, key: &str, span: Span) -> TypeId {
        let kind = TypeErrorKind::NoSuchKey {
            key: key.to_string(),
            ty: self.display(object),
        };
        self.report(kind, span);
        TypeId::ERROR
    }

    /// The `__index` table of a metatable, if it has one
    fn metatable_index(&self, metatable: TypeId) -> Option<TypeId> {
        let index = self.arena.as_table(metatable)?.props.get("__index")?.ty;
        self.arena.as_table(index).map(|_| self.arena.follow(index))
    }

    /// The function stored under a metamethod name, if any
    fn metamethod(&self, ty: TypeId, name: &str) -> Option<TypeId> {
        let metatable = self.arena.as_table(ty)?.metatable?;
        let method = self.arena.as_table(metatable)?.props.get(name)?.ty;
        self.arena.is_function(method).then_some(method)
    }

    /// `object.key = value`
    pub fn assign_prop(&mut self, object: TypeId, key: &str, value: TypeId, span: Span) {
        let object = self.arena.follow(object);
        match self.arena.get(object).clone() {
            TypeKind::Any | TypeKind::Error | TypeKind::Blocked | TypeKind::Never => {}
            TypeKind::Free { .. } => {
                let mut table = TableType::new(TableState::Free);
                table.props.insert(key.to_string(), Property::new(value));
                let table = self.arena.table(table);
                self.arena.bind(object, table);
            }
            TypeKind::Table(table) => {
                if let Some(prop) = table.props.get(key) {
                    self.unify(value, prop.ty, span);
                } else if let Some((_, indexer_value)) =
                    table.indexer.filter(|&(k, _)| self.is_subtype(TypeId::STRING, k))
                {
                    self.unify(value, indexer_value, span);
                } else if table.state != TableState::Sealed {
                    if let Some(table) = self.arena.as_table_mut(object) {
                        table.props.insert(key.to_string(), Property::new(value));
                    }
                } else {
                    let kind = TypeErrorKind::CannotExtendTable {
                        key: key.to_string(),
                        table: self.display(object),
                    };
                    self.report(kind, span);
                }
            }
            TypeKind::Union(parts) => {
                let non_nil: Vec<TypeId> = parts
                    .iter()
                    .copied()
                    .filter(|&p| self.arena.follow(p) != TypeId::NIL)
                    .collect();
                if non_nil.len() < parts.len() && self.strict() {
                    let kind = TypeErrorKind::OptionalValueAccess { ty: self.display(object) };
                    self.report(kind, span);
                }
                for part in non_nil {
                    self.assign_prop(part, key, value, span);
                }
            }
            _ => {
                self.no_such_key(object, key, span);
            }
        }
    }

    /// Type of `object[key]`
    pub fn index_expr_type(&mut self, object: TypeId, key: TypeId, span: Span) -> TypeId {
        let object = self.arena.follow(object);
        if let TypeKind::Singleton(Singleton::String(name)) = self.arena.kind(key).clone() {
            if self.arena.as_table(object).is_some_and(|t| t.props.contains_key(&name)) {
                return self.index_type(object, &name, span);
            }
        }

        match self.arena.get(object).clone() {
            TypeKind::Error => TypeId::ERROR,
            TypeKind::Free { level } => {
                let value = self.arena.fresh(level);
                let mut table = TableType::new(TableState::Free);
                table.indexer = Some((key, value));
                let table = self.arena.table(table);
                self.arena.bind(object, table);
                value
            }
            TypeKind::Table(table) => match table.indexer {
                Some((key_ty, value)) => {
                    self.unify(key, key_ty, span);
                    value
                }
                None if table.state == TableState::Free => {
                    let value = self.arena.fresh(self.level);
                    if let Some(table) = self.arena.as_table_mut(object) {
                        table.indexer = Some((key, value));
                    }
                    value
                }
                None => TypeId::ANY,
            },
            TypeKind::Union(parts) => {
                let non_nil: Vec<TypeId> = parts
                    .iter()
                    .copied()
                    .filter(|&p| self.arena.follow(p) != TypeId::NIL)
                    .collect();
                if non_nil.len() < parts.len() && self.strict() {
                    let kind = TypeErrorKind::OptionalValueAccess { ty: self.display(object) };
                    self.report(kind, span);
                }
                let results = non_nil
                    .into_iter()
                    .map(|p| self.index_expr_type(p, key, span))
                    .collect();
                self.arena.union(results)
            }
            _ => TypeId::ANY,
        }
    }

    /// `object[key] = value`
    pub fn assign_index(&mut self, object: TypeId, key: TypeId, value: TypeId, span: Span) {
        let object = self.arena.follow(object);
        if let TypeKind::Singleton(Singleton::String(name)) = self.arena.kind(key).clone() {
            self.assign_prop(object, &name, value, span);
            return;
        }

        match self.arena.get(object).clone() {
            TypeKind::Free { .. } => {
                let mut table = TableType::new(TableState::Free);
                table.indexer = Some((key, value));
                let table = self.arena.table(table);
                self.arena.bind(object, table);
            }
            TypeKind::Table(table) => match table.indexer {
                Some((key_ty, value_ty)) => {
                    self.unify(key, key_ty, span);
                    self.unify(value, value_ty, span);
                }
                None if table.state != TableState::Sealed => {
                    if let Some(table) = self.arena.as_table_mut(object) {
                        table.indexer = Some((key, value));
                    }
                }
                None => {
                    let kind = TypeErrorKind::CannotExtendTable {
                        key: format!("[{}]", self.display(key)),
                        table: self.display(object),
                    };
                    self.report(kind, span);
                }
            },
            _ => {}
        }
    }

    pub fn binary_type(&mut self, op: BinaryOp, left: TypeId, right: TypeId, span: Span) -> TypeId {
        match op {
            BinaryOp::And => right,
            BinaryOp::Or => {
                let left = self.arena.strip_nil(left);
                self.arena.union(vec![left, right])
            }
            BinaryOp::Eq | BinaryOp::Ne => TypeId::BOOLEAN,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                self.check_comparison(op, left, right, span);
                TypeId::BOOLEAN
            }
            BinaryOp::Concat => {
                let concatenable = self.arena.union(vec![TypeId::STRING, TypeId::NUMBER]);
                for operand in [left, right] {
                    if self.metamethod(operand, "__concat").is_none() {
                        self.unify(operand, concatenable, span);
                    }
                }
                TypeId::STRING
            }
            _ => {
                let name = arithmetic_metamethod(op);
                for operand in [left, right] {
                    if let Some(method) = self.metamethod(operand, name) {
                        let args = CallArgs {
                            types: vec![left, right],
                            spans: vec![span, span],
                            tail: None,
                        };
                        return self.call_type(method, &args, span, None).first();
                    }
                }
                for operand in [left, right] {
                    self.unify(operand, TypeId::NUMBER, span);
                }
                TypeId::NUMBER
            }
        }
    }

    fn check_comparison(&mut self, op: BinaryOp, left: TypeId, right: TypeId, span: Span) {
        let (left, right) = (self.arena.follow(left), self.arena.follow(right));
        if self.arena.is_any_like(left) || self.arena.is_any_like(right) {
            return;
        }
        if self.arena.as_table(left).is_some() {
            if self.metamethod(left, "__lt").is_none() && self.metamethod(left, "__le").is_none() {
                let kind = TypeErrorKind::OperatorNotApplicable {
                    op: op.symbol().to_string(),
                    ty: self.display(left),
                };
                self.report(kind, span);
            }
            return;
        }
        if self.arena.is_free(left) {
            self.unify(left, right, span);
        } else if self.is_subtype(left, TypeId::STRING) {
            self.unify(right, TypeId::STRING, span);
        } else {
            self.unify(left, TypeId::NUMBER, span);
            self.unify(right, TypeId::NUMBER, span);
        }
    }

    pub fn unary_type(&mut self, op: UnaryOp, operand: TypeId, span: Span) -> TypeId {
        match op {
            UnaryOp::Not => TypeId::BOOLEAN,
            UnaryOp::Neg => {
                if let Some(method) = self.metamethod(operand, "__unm") {
                    let args = CallArgs { types: vec![operand], spans: vec![span], tail: None };
                    return self.call_type(method, &args, span, None).first();
                }
                self.unify(operand, TypeId::NUMBER, span);
                TypeId::NUMBER
            }
            UnaryOp::Len => {
                let operand = self.arena.follow(operand);
                let lengthy = matches!(
                    self.arena.get(operand),
                    TypeKind::Any
                        | TypeKind::Error
                        | TypeKind::Free { .. }
                        | TypeKind::Blocked
                        | TypeKind::Table(_)
                        | TypeKind::Primitive(Primitive::String)
                        | TypeKind::Singleton(Singleton::String(_))
                );
                if !lengthy {
                    let kind = TypeErrorKind::OperatorNotApplicable {
                        op: "#".to_string(),
                        ty: self.display(operand),
                    };
                    self.report(kind, span);
                }
                TypeId::NUMBER
            }
        }
    }

    /// Check a call and return the pack it produces. `callee` names the
    /// global being called, for the few builtins with special behavior.
    pub fn call_type(&mut self, func: TypeId, args: &CallArgs, span: Span, callee: Option<&str>) -> TypePack {
        let func = self.arena.follow(func);
        match self.arena.get(func).clone() {
            TypeKind::Any | TypeKind::Blocked => TypePack::variadic(TypeId::ANY),
            TypeKind::Error => TypePack::variadic(TypeId::ERROR),
            TypeKind::Never => TypePack::new(vec![TypeId::NEVER]),
            TypeKind::Free { level } => {
                let ret = self.arena.fresh(level);
                let signature = FunctionType {
                    generics: Vec::new(),
                    params: TypePack::new(args.types.clone()),
                    param_names: vec![None; args.types.len()],
                    returns: TypePack::new(vec![ret]),
                };
                let signature = self.arena.function(signature);
                self.arena.bind(func, signature);
                TypePack::new(vec![ret])
            }
            TypeKind::Function(_) => {
                let returns = self.call_function(func, args, span);
                if callee == Some("setmetatable") {
                    self.attach_metatable(args);
                }
                returns
            }
            TypeKind::Intersection(parts) => {
                let chosen = parts
                    .iter()
                    .copied()
                    .find(|&part| self.accepts_args(part, args))
                    .or_else(|| parts.first().copied());
                match chosen {
                    Some(part) => self.call_type(part, args, span, callee),
                    None => TypePack::variadic(TypeId::ERROR),
                }
            }
            TypeKind::Union(parts) => {
                let non_nil: Vec<TypeId> = parts
                    .iter()
                    .copied()
                    .filter(|&p| self.arena.follow(p) != TypeId::NIL)
                    .collect();
                if non_nil.len() < parts.len() && self.strict() {
                    let kind = TypeErrorKind::OptionalValueAccess { ty: self.display(func) };
                    self.report(kind, span);
                }
                match non_nil.as_slice() {
                    [only] => self.call_type(*only, args, span, callee),
                    _ if non_nil.iter().all(|&p| self.arena.is_function(p)) => {
                        let packs: Vec<TypePack> = non_nil
                            .iter()
                            .map(|&p| self.call_type(p, args, span, callee))
                            .collect();
                        let first = packs.iter().map(|p| p.first()).collect();
                        TypePack::new(vec![self.arena.union(first)])
                    }
                    _ => self.not_callable(func, span),
                }
            }
            TypeKind::Table(_) => match self.metamethod(func, "__call") {
                Some(method) => {
                    let mut with_self = args.clone();
                    with_self.types.insert(0, func);
                    with_self.spans.insert(0, span);
                    self.call_type(method, &with_self, span, None)
                }
                None => self.not_callable(func, span),
            },
            _ => self.not_callable(func, span),
        }
    }

    fn not_callable(&mut self, func: TypeId, span: Span) -> TypePack {
        let kind = TypeErrorKind::NotCallable { ty: self.display(func) };
        self.report(kind, span);
        TypePack::variadic(TypeId::ERROR)
    }

    fn accepts_args(&mut self, func: TypeId, args: &CallArgs) -> bool {
        let Some(signature) = self.arena.as_function(func).cloned() else {
            return false;
        };
        if signature.params.tail.is_none() && args.types.len() > signature.params.head.len() {
            return false;
        }
        args.types.iter().enumerate().all(|(i, &arg)| {
            match signature.params.head.get(i).copied().or(signature.params.tail) {
                Some(param) => self.is_subtype(arg, param),
                None => true,
            }
        })
    }

    fn call_function(&mut self, func: TypeId, args: &CallArgs, span: Span) -> TypePack {
        let func = instantiate(&mut self.arena, func, self.level);
        let Some(signature) = self.arena.as_function(func).cloned() else {
            return TypePack::variadic(TypeId::ANY);
        };

        let max = match signature.params.tail {
            Some(_) => None,
            None => Some(signature.params.head.len()),
        };
        let min = signature
            .params
            .head
            .iter()
            .rposition(|&p| !self.accepts_nil(p))
            .map_or(0, |i| i + 1);
        let actual = args.types.len();
        let too_many = max.is_some_and(|max| actual > max);
        let too_few = actual < min && args.tail.is_none();
        if too_many || too_few {
            self.report(TypeErrorKind::CountMismatch { min, max, actual }, span);
        }

        for (i, &arg) in args.types.iter().enumerate() {
            let param = signature.params.head.get(i).copied().or(signature.params.tail);
            if let Some(param) = param {
                let arg_span = args.spans.get(i).copied().unwrap_or(span);
                self.unify(arg, param, arg_span);
            }
        }
        if let Some(tail) = args.tail {
            for &param in signature.params.head.iter().skip(actual) {
                self.unify(tail, param, span);
            }
        }

        signature.returns
    }

    fn accepts_nil(&mut self, ty: TypeId) -> bool {
        let ty = self.arena.follow(ty);
        !self.arena.is_free(ty) && self.is_subtype(TypeId::NIL, ty)
    }

    fn attach_metatable(&mut self, args: &CallArgs) {
        if let [target, metatable, ..] = args.types.as_slice() {
            let metatable = self.arena.follow(*metatable);
            if self.arena.as_table(metatable).is_none() {
                return;
            }
            if let Some(table) = self.arena.as_table_mut(*target) {
                table.metatable = Some(metatable);
            }
        }
    }

    /// Types of the loop variables of `for vars in values do`
    pub fn iterate_types(&mut self, values: &[TypeId], count: usize, span: Span) -> Vec<TypeId> {
        let Some(&iterator) = values.first() else {
            return vec![TypeId::ANY; count];
        };
        let iterator = self.arena.follow(iterator);

        match self.arena.get(iterator).clone() {
            TypeKind::Function(_) => {
                let func = instantiate(&mut self.arena, iterator, self.level);
                let returns = self
                    .arena
                    .as_function(func)
                    .map(|f| f.returns.clone())
                    .unwrap_or_default();
                (0..count).map(|i| returns.get(i)).collect()
            }
            TypeKind::Table(table) if self.metamethod(iterator, "__call").is_none() => {
                let (key, value) = match table.indexer {
                    Some(pair) => pair,
                    None if table.props.is_empty() => (TypeId::ANY, TypeId::ANY),
                    None => {
                        let values = table.props.values().map(|p| p.ty).collect();
                        (TypeId::STRING, self.arena.union(values))
                    }
                };
                let mut vars = vec![key, value];
                vars.resize(count.max(2), TypeId::NIL);
                vars.truncate(count);
                vars
            }
            TypeKind::Any | TypeKind::Error | TypeKind::Free { .. } | TypeKind::Blocked => {
                vec![TypeId::ANY; count]
            }
            _ => {
                let args = CallArgs::default();
                let returns = self.call_type(iterator, &args, span, None);
                (0..count).map(|i| returns.get(i)).collect()
            }
        }
    }

    /// Type of `require(path)` plus the exported aliases of the module
    pub fn require_type(&mut self, path: &str, span: Span) -> (TypeId, IndexMap<String, AliasDef>) {
        match self.imports.import(path) {
            ModuleImport::Resolved { name, graph } => {
                let mut importer = TypeImporter::new(&graph.arena, self.limits.max_type_depth);
                let mut exports = IndexMap::new();
                for (alias, def) in &graph.exported_types {
                    let imported = AliasDef {
                        generics: def.generics.iter().map(|&g| importer.import(&mut self.arena, g)).collect(),
                        ty: importer.import(&mut self.arena, def.ty),
                    };
                    exports.insert(alias.clone(), imported);
                }
                let ty = match graph.module_type {
                    Some(ty) => importer.import(&mut self.arena, ty),
                    None => {
                        let kind = TypeErrorKind::ModuleReturnCount { module: name.to_string() };
                        self.report(kind, span);
                        TypeId::ERROR
                    }
                };
                if importer.too_complex {
                    self.report_too_complex(span);
                }
                (ty, exports)
            }
            ModuleImport::Unresolved => {
                self.report(TypeErrorKind::UnknownRequire { path: path.to_string() }, span);
                (TypeId::ANY, IndexMap::new())
            }
            ModuleImport::Cyclic(cycle) => {
                self.report(TypeErrorKind::CyclicModule { cycle: cycle.to_string() }, span);
                (TypeId::ANY, IndexMap::new())
            }
            ModuleImport::Unavailable => (TypeId::ERROR, IndexMap::new()),
        }
    }

    /// Record `type Name = ...` for completion and, when exported, for
    /// dependents
    pub fn record_alias(&mut self, name: &str, exported: bool, def: AliasDef) {
        self.type_aliases.insert(name.to_string(), def.ty);
        if exported {
            self.exported_types.insert(name.to_string(), def);
        }
    }

    pub fn finish(mut self) -> (TypeGraph, Vec<TypeError>) {
        self.errors.sort_by_key(|e| (e.span.start, e.span.end));
        let graph = TypeGraph {
            arena: self.arena,
            expr_types: self.expr_types,
            binding_types: self.binding_types,
            call_types: self.call_types,
            globals: self.globals,
            module_type: self.module_type,
            exported_types: self.exported_types,
            type_aliases: self.type_aliases,
            parse_failed: false,
        };
        (graph, self.errors)
    }
}

fn arithmetic_metamethod(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "__add",
        BinaryOp::Sub => "__sub",
        BinaryOp::Mul => "__mul",
        BinaryOp::Div => "__div",
        BinaryOp::FloorDiv => "__idiv",
        BinaryOp::Mod => "__mod",
        BinaryOp::Pow => "__pow",
        _ => "__add",
    }
}

/// Locals narrowed to non-nil when `condition` is truthy: `if x`,
/// `if x ~= nil`, and conjunctions of those
pub fn truthy_refinements(condition: &Expr) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect_truthy(condition, &mut out);
    out
}

fn collect_truthy(expr: &Expr, out: &mut Vec<NodeId>) {
    match &expr.kind {
        ExprKind::Local { binding, .. } => out.push(*binding),
        ExprKind::Group(inner) => collect_truthy(inner, out),
        ExprKind::Binary { op: BinaryOp::And, left, right } => {
            collect_truthy(left, out);
            collect_truthy(right, out);
        }
        ExprKind::Binary { op: BinaryOp::Ne, left, right } => match (&left.kind, &right.kind) {
            (ExprKind::Local { binding, .. }, ExprKind::Nil)
            | (ExprKind::Nil, ExprKind::Local { binding, .. }) => out.push(*binding),
            _ => {}
        },
        _ => {}
    }
}
