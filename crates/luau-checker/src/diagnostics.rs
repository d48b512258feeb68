//! Diagnostics reported to editors and the command line
//!
//! Everything the engine finds (syntax errors, type errors and lint
//! warnings) ends up as a `Diagnostic` with a 0-indexed, half-open range.

use luau_ast::{LineIndex, Range, Span};
use luau_parser::ParseError;
use serde::{Deserialize, Serialize};

use crate::lint::LintWarning;
use crate::TypeError;

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Error code (e.g., "TypeMismatch", "SyntaxError", "LocalShadow")
    pub code: String,
    pub message: String,
    pub range: Range,
    /// Byte span in the module source
    #[serde(skip)]
    pub span: Span,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn new(code: impl Into<String>, message: impl Into<String>, span: Span, lines: &LineIndex) -> Self {
        Self {
            severity: Severity::Error,
            code: code.into(),
            message: message.into(),
            range: lines.range(span),
            span,
        }
    }

    /// Set severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn from_parse_error(error: &ParseError, lines: &LineIndex) -> Self {
        Diagnostic::new("SyntaxError", error.to_string(), error.span(), lines)
    }

    pub fn from_type_error(error: &TypeError, lines: &LineIndex) -> Self {
        Diagnostic::new(error.kind.code(), error.kind.to_string(), error.span, lines)
    }

    pub fn from_lint(warning: &LintWarning, lines: &LineIndex) -> Self {
        Diagnostic::new(warning.code, warning.message.clone(), warning.span, lines)
            .with_severity(Severity::Warning)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Format the diagnostic as a simple string
    pub fn format_simple(&self, module: &str) -> String {
        format!(
            "{}({},{}): {}: {}",
            module,
            self.range.start.line + 1,
            self.range.start.column + 1,
            self.code,
            self.message
        )
    }
}

/// Order diagnostics by position, then by message for stable output
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        (a.range.start, a.range.end, &a.message).cmp(&(b.range.start, b.range.end, &b.message))
    });
}
