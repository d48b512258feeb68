//! Position-addressed editor queries over a checked module
//!
//! Every query takes the module's check results and a byte offset; the
//! session converts editor line/column positions before calling in.
//! Queries never fail: anything they cannot answer is an empty result.

mod autocomplete;
mod hover;
mod locate;
mod signature;
mod text;

use serde::{Deserialize, Serialize};

pub use autocomplete::{autocomplete, KEYWORDS};
pub use hover::hover;
pub use locate::{node_at, visible_locals, Located};
pub use signature::signature_help;

/// What a completion entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionKind {
    Property,
    Keyword,
    Constant,
    Type,
    Module,
    Variable,
    Function,
}

impl CompletionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionKind::Property => "property",
            CompletionKind::Keyword => "keyword",
            CompletionKind::Constant => "constant",
            CompletionKind::Type => "type",
            CompletionKind::Module => "module",
            CompletionKind::Variable => "variable",
            CompletionKind::Function => "function",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    /// Type of the entry, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub deprecated: bool,
}

impl CompletionItem {
    pub fn new(label: impl Into<String>, kind: CompletionKind) -> Self {
        Self {
            label: label.into(),
            kind,
            detail: None,
            deprecated: false,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }
}

/// The signature of the call surrounding a position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureHelp {
    /// Full function type, e.g. `(a: number, b: string) -> boolean`
    pub label: String,
    /// One label per parameter, e.g. `a: number`
    pub parameters: Vec<String>,
    pub active_parameter: usize,
}
