//! Type annotation syntax

use serde::{Deserialize, Serialize};
use crate::{Expr, GenericParam, Span};

/// A type expression as written in the source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeExprKind {
    /// `number`, `Map<K, V>`, `mod.Type`
    Reference {
        prefix: Option<String>,
        name: String,
        params: Vec<TypeExpr>,
    },

    /// `typeof(expr)`
    Typeof(Box<Expr>),

    /// `{ name: T, [K]: V }` or the array shorthand `{ T }`
    Table {
        props: Vec<TableTypeProp>,
        indexer: Option<Box<(TypeExpr, TypeExpr)>>,
    },

    /// `<T>(a: A, ...B) -> R`
    Function {
        generics: Vec<GenericParam>,
        params: Vec<FunctionTypeParam>,
        variadic: Option<Box<TypeExpr>>,
        returns: TypePack,
    },

    Union(Vec<TypeExpr>),

    Intersection(Vec<TypeExpr>),

    /// `T?`
    Optional(Box<TypeExpr>),

    /// `"literal"`
    StringSingleton(String),

    /// `true` / `false`
    BoolSingleton(bool),

    /// `nil`
    Nil,

    /// `(T)`
    Group(Box<TypeExpr>),

    /// Placeholder produced by error recovery
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableTypeProp {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionTypeParam {
    pub name: Option<String>,
    pub ty: TypeExpr,
}

/// A list of types with an optional variadic tail, as used for return
/// annotations: `(number, string)`, `...number`, `()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypePack {
    pub types: Vec<TypeExpr>,
    pub variadic: Option<Box<TypeExpr>>,
    pub span: Span,
}

impl TypeExpr {
    pub fn new(kind: TypeExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}
