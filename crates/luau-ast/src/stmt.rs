//! Statement AST nodes

use serde::{Deserialize, Serialize};
use crate::{BinaryOp, Expr, FunctionBody, GenericParam, NodeId, Span, TypeExpr};

/// A block of statements
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    pub stats: Vec<Stat>,
    pub span: Span,
}

/// A statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stat {
    pub kind: StatKind,
    pub span: Span,
}

/// A local variable, parameter or loop variable introduced by the source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binding {
    pub id: NodeId,
    pub name: String,
    pub annotation: Option<TypeExpr>,
    /// Span of the name only
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StatKind {
    /// `local a: T, b = x, y`
    Local { bindings: Vec<Binding>, values: Vec<Expr> },

    /// `local function f() end`
    LocalFunction { binding: Binding, func: FunctionBody },

    /// `function a.b:c() end`; the target is a global, local or index chain
    Function { target: Expr, func: FunctionBody },

    /// `a, b.c = x, y`
    Assign { targets: Vec<Expr>, values: Vec<Expr> },

    /// `a += 1`
    CompoundAssign { op: BinaryOp, target: Expr, value: Expr },

    /// Call used as a statement
    Call(Expr),

    If {
        /// `if`/`elseif` condition and body pairs
        clauses: Vec<(Expr, Block)>,
        else_block: Option<Block>,
    },

    While { condition: Expr, body: Block },

    Repeat { body: Block, condition: Expr },

    NumericFor {
        var: Binding,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Block,
    },

    GenericFor { vars: Vec<Binding>, values: Vec<Expr>, body: Block },

    Do(Block),

    Break,

    Continue,

    Return(Vec<Expr>),

    /// `type Name<T> = Type` / `export type ...`
    TypeAlias {
        name: String,
        name_span: Span,
        generics: Vec<GenericParam>,
        ty: TypeExpr,
        exported: bool,
    },

    /// Expressions salvaged from a statement that failed to parse; kept so
    /// the checker can still type them for autocomplete.
    Error { exprs: Vec<Expr> },
}

impl Stat {
    /// Statements after which the rest of the block is unreachable
    pub fn is_terminator(&self) -> bool {
        matches!(
            self.kind,
            StatKind::Return(_) | StatKind::Break | StatKind::Continue
        )
    }
}
