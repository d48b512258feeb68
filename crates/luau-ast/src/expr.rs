//! Expression AST nodes

use serde::{Deserialize, Serialize};
use crate::{Block, Binding, NodeId, Span, TypeExpr, TypePack};

/// An expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    Nil,
    Bool(bool),
    Number(f64),
    /// String literal with escapes already decoded
    String(String),
    /// `...`
    Varargs,

    /// Reference to a local resolved at parse time
    Local { name: String, binding: NodeId },

    /// Reference to a global (no visible local of that name)
    Global(String),

    /// `(expr)` - truncates multiple values to one
    Group(Box<Expr>),

    /// Anonymous function: `function(a, b) ... end`
    Function(Box<FunctionBody>),

    /// Table constructor: `{ 1, x = 2, [k] = v }`
    Table(Vec<TableItem>),

    /// Function call; for `obj:m(args)` the callee is an `IndexName` with
    /// `is_method` set and `self` is passed implicitly.
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        /// Span of the argument list including the parentheses
        args_span: Span,
    },

    /// `obj.name` or `obj:name`. The name is empty when recovering from an
    /// incomplete member access such as `obj.` at the end of a line.
    IndexName {
        object: Box<Expr>,
        name: String,
        name_span: Span,
        is_method: bool,
    },

    /// `obj[index]`
    IndexExpr { object: Box<Expr>, index: Box<Expr> },

    Unary { op: UnaryOp, operand: Box<Expr> },

    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },

    /// `expr :: Type`
    TypeAssertion { expr: Box<Expr>, ty: TypeExpr },

    /// `if a then b elseif c then d else e`
    IfElse {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },

    /// Placeholder produced by error recovery
    Error,
}

impl Expr {
    /// Name of the referenced identifier, for locals and globals
    pub fn ident_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Local { name, .. } | ExprKind::Global(name) => Some(name),
            _ => None,
        }
    }

    /// Whether this expression can produce more than one value
    /// (calls and `...` in tail position).
    pub fn is_multi_value(&self) -> bool {
        matches!(self.kind, ExprKind::Call { .. } | ExprKind::Varargs)
    }

    /// Dotted path for `a.b.c` chains of globals/locals, used for
    /// deprecation lookups and function-statement names.
    pub fn dotted_path(&self) -> Option<String> {
        match &self.kind {
            ExprKind::Local { name, .. } | ExprKind::Global(name) => Some(name.clone()),
            ExprKind::IndexName { object, name, .. } => {
                object.dotted_path().map(|prefix| format!("{}.{}", prefix, name))
            }
            _ => None,
        }
    }
}

/// Body shared by function statements and function expressions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionBody {
    /// Name used for display, e.g. `foo` or `Account:deposit`
    pub debug_name: Option<String>,
    pub generics: Vec<GenericParam>,
    /// Implicit `self` for `function T:m()` definitions
    pub self_binding: Option<Binding>,
    pub params: Vec<Binding>,
    /// `...` parameter with optional annotation
    pub vararg: Option<VarargParam>,
    pub return_annotation: Option<TypePack>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarargParam {
    pub annotation: Option<TypeExpr>,
    pub span: Span,
}

/// A generic type parameter: `<T>` or `<T...>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericParam {
    pub name: String,
    pub is_pack: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TableItem {
    /// `{ value }`
    Positional(Expr),
    /// `{ name = value }`
    Named { name: String, name_span: Span, value: Expr },
    /// `{ [key] = value }`
    Keyed { key: Expr, value: Expr },
}

impl TableItem {
    pub fn value(&self) -> &Expr {
        match self {
            TableItem::Positional(value)
            | TableItem::Named { value, .. }
            | TableItem::Keyed { value, .. } => value,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Concat => "..",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "~=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Sub
                | BinaryOp::Mul
                | BinaryOp::Div
                | BinaryOp::FloorDiv
                | BinaryOp::Mod
                | BinaryOp::Pow
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    /// Left and right binding power, Luau precedence table
    pub fn priority(self) -> (u8, u8) {
        match self {
            BinaryOp::Or => (1, 1),
            BinaryOp::And => (2, 2),
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => (3, 3),
            // right associative
            BinaryOp::Concat => (5, 4),
            BinaryOp::Add | BinaryOp::Sub => (6, 6),
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod => (7, 7),
            BinaryOp::Pow => (10, 9),
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    Len,
}

impl UnaryOp {
    pub const PRIORITY: u8 = 8;

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not ",
            UnaryOp::Len => "#",
        }
    }
}
