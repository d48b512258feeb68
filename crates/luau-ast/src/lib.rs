//! Luau AST - Core types for the abstract syntax tree
//!
//! This crate defines the AST node types produced by the parser, spans for
//! source locations and the line index used to talk to editors in 0-indexed
//! line/column positions.

mod span;
mod types;
mod expr;
mod stmt;
pub mod visit;

pub use span::*;
pub use types::*;
pub use expr::*;
pub use stmt::*;

use serde::{Deserialize, Serialize};

/// Identifier of an expression or binding node, unique within one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// A parsed module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chunk {
    pub block: Block,
    /// `--!name` directives that appear before the first statement
    pub hot_comments: Vec<HotComment>,
    /// Number of node ids handed out while parsing
    pub node_count: u32,
    pub span: Span,
}

impl Chunk {
    pub fn has_hot_comment(&self, name: &str) -> bool {
        self.hot_comments.iter().any(|c| c.name == name)
    }
}

/// A `--!strict`-style directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotComment {
    pub name: String,
    pub span: Span,
}
