//! Type alias scopes and resolution of written annotations into types

use indexmap::IndexMap;
use luau_ast::{self as ast, Block, Expr, GenericParam, Span, StatKind, TypeExpr, TypeExprKind};
use rustc_hash::FxHashMap;

use crate::error::TypeErrorKind;
use crate::instantiate::substitute;
use crate::types::*;

/// A `type Name<T...> = ...` definition
#[derive(Debug, Clone, PartialEq)]
pub struct AliasDef {
    pub generics: Vec<TypeId>,
    pub ty: TypeId,
}

/// Lexically scoped type names plus the exported aliases of required
/// modules, reachable as `module.Type`
#[derive(Debug, Clone)]
pub struct TypeScopes {
    scopes: Vec<FxHashMap<String, AliasDef>>,
    modules: FxHashMap<String, IndexMap<String, AliasDef>>,
}

impl Default for TypeScopes {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeScopes {
    pub fn new() -> Self {
        Self {
            scopes: vec![FxHashMap::default()],
            modules: FxHashMap::default(),
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn define(&mut self, name: &str, def: AliasDef) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), def);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&AliasDef> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn define_module(&mut self, local_name: &str, exports: IndexMap<String, AliasDef>) {
        self.modules.insert(local_name.to_string(), exports);
    }

    pub fn lookup_module(&self, module: &str, name: &str) -> Option<&AliasDef> {
        self.modules.get(module).and_then(|exports| exports.get(name))
    }
}

/// Turns annotations into types. Implementors supply the arena, scopes and
/// error sink; `typeof` needs an expression checker so it is left to them.
pub trait ResolveTypes {
    fn arena(&mut self) -> &mut TypeArena;

    fn type_scopes(&mut self) -> &mut TypeScopes;

    fn report_type_error(&mut self, kind: TypeErrorKind, span: Span);

    fn typeof_expr(&mut self, expr: &Expr) -> TypeId;

    fn resolve_annotation(&mut self, ty: &TypeExpr) -> TypeId {
        match &ty.kind {
            TypeExprKind::Reference { prefix, name, params } => {
                self.resolve_reference(prefix.as_deref(), name, params, ty.span)
            }
            TypeExprKind::Typeof(expr) => self.typeof_expr(expr),
            TypeExprKind::Table { props, indexer } => {
                let mut table = TableType::new(TableState::Sealed);
                for prop in props {
                    let value = self.resolve_annotation(&prop.ty);
                    table.props.insert(prop.name.clone(), Property::new(value));
                }
                if let Some(pair) = indexer {
                    let key = self.resolve_annotation(&pair.0);
                    let value = self.resolve_annotation(&pair.1);
                    table.indexer = Some((key, value));
                }
                self.arena().table(table)
            }
            TypeExprKind::Function { generics, params, variadic, returns } => {
                self.type_scopes().push();
                let generics = self.declare_generics(generics);
                let mut param_types = Vec::new();
                let mut param_names = Vec::new();
                for param in params {
                    param_types.push(self.resolve_annotation(&param.ty));
                    param_names.push(param.name.clone());
                }
                let tail = variadic.as_ref().map(|v| self.resolve_annotation(v));
                let returns = self.resolve_return_pack(returns);
                self.type_scopes().pop();
                self.arena().function(FunctionType {
                    generics,
                    params: TypePack { head: param_types, tail },
                    param_names,
                    returns,
                })
            }
            TypeExprKind::Union(parts) => {
                let parts = parts.iter().map(|p| self.resolve_annotation(p)).collect();
                self.arena().union(parts)
            }
            TypeExprKind::Intersection(parts) => {
                let parts: Vec<TypeId> = parts.iter().map(|p| self.resolve_annotation(p)).collect();
                self.arena().add(TypeKind::Intersection(parts))
            }
            TypeExprKind::Optional(inner) => {
                let inner = self.resolve_annotation(inner);
                self.arena().optional(inner)
            }
            TypeExprKind::StringSingleton(value) => self.arena().string_singleton(value),
            TypeExprKind::BoolSingleton(value) => self.arena().bool_singleton(*value),
            TypeExprKind::Nil => TypeId::NIL,
            TypeExprKind::Group(inner) => self.resolve_annotation(inner),
            TypeExprKind::Error => TypeId::ERROR,
        }
    }

    fn resolve_reference(
        &mut self,
        prefix: Option<&str>,
        name: &str,
        params: &[TypeExpr],
        span: Span,
    ) -> TypeId {
        let def = match prefix {
            Some(module) => self.type_scopes().lookup_module(module, name).cloned(),
            None => self.type_scopes().lookup(name).cloned(),
        };

        let Some(def) = def else {
            if prefix.is_none() {
                if let Some(builtin) = builtin_type(name) {
                    return builtin;
                }
            }
            let shown = match prefix {
                Some(module) => format!("{}.{}", module, name),
                None => name.to_string(),
            };
            self.report_type_error(TypeErrorKind::UnknownType { name: shown }, span);
            return TypeId::ERROR;
        };

        if def.generics.is_empty() {
            if !params.is_empty() {
                self.report_type_error(
                    TypeErrorKind::GenericArgCount {
                        name: name.to_string(),
                        expected: 0,
                        actual: params.len(),
                    },
                    span,
                );
            }
            return def.ty;
        }

        if params.len() != def.generics.len() {
            self.report_type_error(
                TypeErrorKind::GenericArgCount {
                    name: name.to_string(),
                    expected: def.generics.len(),
                    actual: params.len(),
                },
                span,
            );
        }
        let mut map = FxHashMap::default();
        for (i, &generic) in def.generics.iter().enumerate() {
            let arg = match params.get(i) {
                Some(param) => self.resolve_annotation(param),
                None => TypeId::ERROR,
            };
            let generic = self.arena().follow(generic);
            map.insert(generic, arg);
        }
        substitute(self.arena(), def.ty, &map)
    }

    fn resolve_return_pack(&mut self, pack: &ast::TypePack) -> TypePack {
        TypePack {
            head: pack.types.iter().map(|t| self.resolve_annotation(t)).collect(),
            tail: pack.variadic.as_ref().map(|t| self.resolve_annotation(t)),
        }
    }

    /// Define `<T, U>` in the current type scope and return their types
    fn declare_generics(&mut self, generics: &[GenericParam]) -> Vec<TypeId> {
        generics
            .iter()
            .map(|param| {
                let ty = self.arena().add(TypeKind::Generic(param.name.clone()));
                self.type_scopes().define(
                    &param.name,
                    AliasDef { generics: Vec::new(), ty },
                );
                ty
            })
            .collect()
    }

    /// Declare every alias of a block before its statements are checked, so
    /// aliases can refer to each other and be used ahead of their definition.
    /// Returns the definitions in source order with their exported flag.
    fn declare_type_aliases(&mut self, block: &Block) -> Vec<(String, bool, AliasDef)> {
        let mut pending = Vec::new();
        for stat in &block.stats {
            if let StatKind::TypeAlias { name, generics, ty, exported, .. } = &stat.kind {
                let placeholder = self.arena().fresh(0);
                let generic_types: Vec<TypeId> = generics
                    .iter()
                    .map(|g| self.arena().add(TypeKind::Generic(g.name.clone())))
                    .collect();
                let def = AliasDef { generics: generic_types, ty: placeholder };
                self.type_scopes().define(name, def.clone());
                pending.push((name.clone(), *exported, def, generics, ty));
            }
        }

        let mut declared = Vec::new();
        for (name, exported, def, generics, annotation) in pending {
            self.type_scopes().push();
            for (param, &ty) in generics.iter().zip(&def.generics) {
                self.type_scopes().define(&param.name, AliasDef { generics: Vec::new(), ty });
            }
            let resolved = self.resolve_annotation(annotation);
            self.type_scopes().pop();

            let resolved = if self.arena().follow(resolved) == self.arena().follow(def.ty) {
                TypeId::ERROR
            } else {
                resolved
            };
            if def.generics.is_empty() {
                if let Some(table) = self.arena().as_table_mut(resolved) {
                    if table.name.is_none() {
                        table.name = Some(name.clone());
                    }
                }
            }
            self.arena().bind(def.ty, resolved);
            declared.push((name, exported, def));
        }
        declared
    }
}

/// Type names that exist without any declaration
pub const BUILTIN_TYPE_NAMES: &[&str] = &[
    "nil", "boolean", "number", "string", "thread", "buffer", "any", "unknown", "never",
];

fn builtin_type(name: &str) -> Option<TypeId> {
    if let Some(prim) = Primitive::from_name(name) {
        return Some(TypeArena::primitive(prim));
    }
    match name {
        "any" => Some(TypeId::ANY),
        "unknown" => Some(TypeId::UNKNOWN),
        "never" => Some(TypeId::NEVER),
        _ => None,
    }
}

/// Resolver for annotations that cannot contain `typeof`, such as the
/// builtin definitions
pub struct StandaloneResolver<'a> {
    pub arena: &'a mut TypeArena,
    pub scopes: TypeScopes,
    pub errors: Vec<(TypeErrorKind, Span)>,
}

impl<'a> StandaloneResolver<'a> {
    pub fn new(arena: &'a mut TypeArena) -> Self {
        Self {
            arena,
            scopes: TypeScopes::new(),
            errors: Vec::new(),
        }
    }
}

impl ResolveTypes for StandaloneResolver<'_> {
    fn arena(&mut self) -> &mut TypeArena {
        self.arena
    }

    fn type_scopes(&mut self) -> &mut TypeScopes {
        &mut self.scopes
    }

    fn report_type_error(&mut self, kind: TypeErrorKind, span: Span) {
        self.errors.push((kind, span));
    }

    fn typeof_expr(&mut self, _expr: &Expr) -> TypeId {
        TypeId::ANY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::display;

    fn resolve(source: &str) -> (String, usize) {
        let mut arena = TypeArena::new();
        let ty = luau_parser::parse_type(source).unwrap();
        let mut resolver = StandaloneResolver::new(&mut arena);
        let id = resolver.resolve_annotation(&ty);
        let errors = resolver.errors.len();
        (display(&arena, id), errors)
    }

    #[test]
    fn test_resolve_primitives_and_optionals() {
        assert_eq!(resolve("number?"), ("number?".to_string(), 0));
        assert_eq!(resolve("string | boolean"), ("string | boolean".to_string(), 0));
    }

    #[test]
    fn test_resolve_function_type() {
        assert_eq!(
            resolve("<T>(x: T, ...number) -> (T, string)"),
            ("<T>(x: T, ...number) -> (T, string)".to_string(), 0)
        );
    }

    #[test]
    fn test_resolve_table_type() {
        assert_eq!(resolve("{ number }"), ("{number}".to_string(), 0));
        assert_eq!(resolve("{ b: string, a: number }"), ("{ a: number, b: string }".to_string(), 0));
    }

    #[test]
    fn test_unknown_type_is_reported() {
        let (shown, errors) = resolve("Missing");
        assert_eq!(shown, "*error-type*");
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_aliases_are_hoisted() {
        let parsed = luau_parser::parse("local p: Point = nil\ntype Point = { x: number, y: number }\n");
        let mut arena = TypeArena::new();
        let mut resolver = StandaloneResolver::new(&mut arena);
        let declared = resolver.declare_type_aliases(&parsed.chunk.block);
        assert_eq!(declared.len(), 1);
        let ty = resolver.scopes.lookup("Point").map(|d| d.ty).unwrap();
        assert_eq!(display(&arena, ty), "Point");
    }

    #[test]
    fn test_generic_alias_instantiation() {
        let parsed = luau_parser::parse("type Box<T> = { value: T }\n");
        let mut arena = TypeArena::new();
        let mut resolver = StandaloneResolver::new(&mut arena);
        resolver.declare_type_aliases(&parsed.chunk.block);
        let annotation = luau_parser::parse_type("Box<number>").unwrap();
        let ty = resolver.resolve_annotation(&annotation);
        assert!(resolver.errors.is_empty());
        assert_eq!(display(&arena, ty), "{ value: number }");
    }
}
