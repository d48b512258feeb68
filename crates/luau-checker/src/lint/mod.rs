//! Lint passes
//!
//! Lints run over the syntax tree after type inference and never affect
//! types. Each pass reports warnings whose code is the name of the Luau lint
//! it mirrors.
//!
//! # Passes
//!
//! - **LocalShadow**: a local hides another local of the same name
//! - **DuplicateLocal**: one statement or parameter list declares a name twice
//! - **UnreachableCode**: statements after `return`, `break`, `continue` or `error()`
//! - **DuplicateKeys**: a table constructor sets the same key twice
//! - **UnbalancedAssignment**: value and variable counts differ
//! - **SameLineStatement**: two statements share a line without `;`
//! - **ComparisonPrecedence**: `not a == b` and chained comparisons
//! - **DeprecatedApi**: uses of deprecated builtins

mod assignment;
mod deprecated;
mod locals;
mod precedence;
mod same_line;
mod table_keys;
mod unreachable;

pub use assignment::UnbalancedAssignment;
pub use deprecated::DeprecatedApi;
pub use locals::{DuplicateLocal, LocalShadow};
pub use precedence::ComparisonPrecedence;
pub use same_line::SameLineStatement;
pub use table_keys::DuplicateKeys;
pub use unreachable::UnreachableCode;

use luau_ast::{Chunk, LineIndex, Span};

/// A finding from a lint pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintWarning {
    /// Lint name, e.g. "LocalShadow"
    pub code: &'static str,
    pub message: String,
    pub span: Span,
}

/// What a lint pass can look at
pub struct LintContext<'a> {
    pub chunk: &'a Chunk,
    pub source: &'a str,
    pub lines: &'a LineIndex,
}

impl LintContext<'_> {
    /// 1-based line of a byte offset, as lint messages print it
    pub fn line(&self, offset: usize) -> u32 {
        self.lines.line_of(offset) + 1
    }

    pub fn text(&self, span: Span) -> &str {
        self.source.get(span.start..span.end).unwrap_or("")
    }
}

pub trait LintPass {
    /// Lint name, used as the diagnostic code
    fn name(&self) -> &'static str;

    fn run(&self, ctx: &LintContext<'_>) -> Vec<LintWarning>;
}

/// Every pass, in reporting order
pub fn default_passes() -> Vec<Box<dyn LintPass>> {
    vec![
        Box::new(LocalShadow),
        Box::new(DuplicateLocal),
        Box::new(UnreachableCode),
        Box::new(DuplicateKeys),
        Box::new(UnbalancedAssignment),
        Box::new(SameLineStatement),
        Box::new(ComparisonPrecedence),
        Box::new(DeprecatedApi),
    ]
}

/// Run all lint passes over a chunk
pub fn run_lints(chunk: &Chunk, source: &str, lines: &LineIndex) -> Vec<LintWarning> {
    let ctx = LintContext { chunk, source, lines };
    let mut warnings = Vec::new();
    for pass in default_passes() {
        let found = pass.run(&ctx);
        tracing::trace!(pass = pass.name(), count = found.len(), "lint pass finished");
        warnings.extend(found);
    }
    warnings.sort_by_key(|w| (w.span.start, w.span.end));
    warnings
}

#[cfg(test)]
pub(crate) fn lint_with(pass: &dyn LintPass, source: &str) -> Vec<LintWarning> {
    let parsed = luau_parser::parse(source);
    assert!(parsed.errors.is_empty(), "unexpected parse errors: {:?}", parsed.errors);
    let lines = LineIndex::new(source);
    let ctx = LintContext { chunk: &parsed.chunk, source, lines: &lines };
    pass.run(&ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_pass_names() {
        let source = "local x = 1\nlocal function f()\n  local x = 2\n  return x\nend";
        let parsed = luau_parser::parse(source);
        let lines = LineIndex::new(source);
        let warnings = run_lints(&parsed.chunk, source, &lines);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, "LocalShadow");
    }

    #[test]
    fn test_warnings_sorted() {
        let source = "local a, b = 1\nlocal t = { x = 1, x = 2 }";
        let parsed = luau_parser::parse(source);
        let lines = LineIndex::new(source);
        let codes: Vec<&str> = run_lints(&parsed.chunk, source, &lines)
            .iter()
            .map(|w| w.code)
            .collect();
        assert_eq!(codes, vec!["UnbalancedAssignment", "DuplicateKeys"]);
    }

    #[test]
    fn test_clean_code_has_no_warnings() {
        let source = "local function add(a: number, b: number): number\n  return a + b\nend\nprint(add(1, 2))";
        let parsed = luau_parser::parse(source);
        let lines = LineIndex::new(source);
        assert!(run_lints(&parsed.chunk, source, &lines).is_empty());
    }
}
