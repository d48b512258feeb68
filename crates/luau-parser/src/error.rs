//! Parser error types

use luau_ast::Span;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Expected {expected} when parsing {context}, got {found}")]
    Expected {
        expected: String,
        context: &'static str,
        found: String,
        span: Span,
    },

    #[error("Expected {expected}, got {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Expected {expected} (to close {opener} at line {line}), got {found}")]
    Unclosed {
        expected: String,
        opener: String,
        line: usize,
        found: String,
        span: Span,
    },

    #[error("Incomplete statement: expected assignment or a function call")]
    IncompleteStatement { span: Span },

    #[error("Assigned expression must be a variable or a field")]
    NotAssignable { span: Span },

    #[error("Malformed number")]
    MalformedNumber { span: Span },

    #[error("Malformed string; did you forget to finish it?")]
    MalformedString { span: Span },

    #[error("Unfinished long comment")]
    UnfinishedComment { span: Span },

    #[error("Unexpected symbol '{text}'")]
    UnexpectedSymbol { text: String, span: Span },

    #[error("Exceeded allowed recursion depth; simplify your expression to make the code compile")]
    RecursionLimit { span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::Expected { span, .. } => *span,
            ParseError::UnexpectedToken { span, .. } => *span,
            ParseError::Unclosed { span, .. } => *span,
            ParseError::IncompleteStatement { span } => *span,
            ParseError::NotAssignable { span } => *span,
            ParseError::MalformedNumber { span } => *span,
            ParseError::MalformedString { span } => *span,
            ParseError::UnfinishedComment { span } => *span,
            ParseError::UnexpectedSymbol { span, .. } => *span,
            ParseError::RecursionLimit { span } => *span,
        }
    }

    pub fn expected(
        expected: impl Into<String>,
        context: &'static str,
        found: impl Into<String>,
        span: Span,
    ) -> Self {
        ParseError::Expected {
            expected: expected.into(),
            context,
            found: found.into(),
            span,
        }
    }

    pub fn unexpected(expected: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }
}
