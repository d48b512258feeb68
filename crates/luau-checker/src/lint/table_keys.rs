//! Table constructors that set the same key twice

use luau_ast::visit::{walk_expr, Visitor};
use luau_ast::{Expr, ExprKind, TableItem};
use rustc_hash::FxHashMap;

use super::{LintContext, LintPass, LintWarning};

pub struct DuplicateKeys;

impl LintPass for DuplicateKeys {
    fn name(&self) -> &'static str {
        "DuplicateKeys"
    }

    fn run(&self, ctx: &LintContext<'_>) -> Vec<LintWarning> {
        let mut visitor = KeyVisitor { ctx, warnings: Vec::new() };
        visitor.visit_block(&ctx.chunk.block);
        visitor.warnings
    }
}

#[derive(PartialEq, Eq, Hash)]
enum Key {
    Name(String),
    /// Integer keys, including the implicit ones of positional items
    Index(i64),
}

struct KeyVisitor<'c, 'a> {
    ctx: &'c LintContext<'a>,
    warnings: Vec<LintWarning>,
}

impl KeyVisitor<'_, '_> {
    fn check_table(&mut self, items: &[TableItem]) {
        let mut seen: FxHashMap<Key, u32> = FxHashMap::default();
        let mut next_index = 1;

        for item in items {
            let (key, span) = match item {
                TableItem::Positional(value) => {
                    let key = Key::Index(next_index);
                    next_index += 1;
                    (key, value.span)
                }
                TableItem::Named { name, name_span, .. } => (Key::Name(name.clone()), *name_span),
                TableItem::Keyed { key, .. } => match literal_key(key) {
                    Some(literal) => (literal, key.span),
                    None => continue,
                },
            };

            let line = self.ctx.line(span.start);
            if let Some(&previous) = seen.get(&key) {
                let message = match &key {
                    Key::Name(name) => format!(
                        "Table field '{}' is a duplicate; previously defined at line {}",
                        name, previous
                    ),
                    Key::Index(index) => format!(
                        "Table index {} is a duplicate; previously defined at line {}",
                        index, previous
                    ),
                };
                self.warnings.push(LintWarning { code: "DuplicateKeys", message, span });
            } else {
                seen.insert(key, line);
            }
        }
    }
}

fn literal_key(key: &Expr) -> Option<Key> {
    match &key.kind {
        ExprKind::String(name) => Some(Key::Name(name.clone())),
        ExprKind::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(Key::Index(*n as i64)),
        _ => None,
    }
}

impl<'ast> Visitor<'ast> for KeyVisitor<'_, '_> {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        if let ExprKind::Table(items) = &expr.kind {
            self.check_table(items);
        }
        walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::lint_with;

    #[test]
    fn test_named_duplicate() {
        let source = "local t = {\n  a = 1,\n  a = 2,\n}";
        let warnings = lint_with(&DuplicateKeys, source);
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].message,
            "Table field 'a' is a duplicate; previously defined at line 2"
        );
    }

    #[test]
    fn test_string_key_matches_name() {
        let source = "local t = { a = 1, ['a'] = 2 }";
        assert_eq!(lint_with(&DuplicateKeys, source).len(), 1);
    }

    #[test]
    fn test_index_collides_with_positional() {
        let source = "local t = { 'x', [1] = 'y' }";
        let warnings = lint_with(&DuplicateKeys, source);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.starts_with("Table index 1 is a duplicate"));
    }

    #[test]
    fn test_distinct_keys() {
        let source = "local t = { a = 1, b = { a = 2 }, [2] = 3, 'x' }";
        assert!(lint_with(&DuplicateKeys, source).is_empty());
    }
}
