//! Completion entries for a cursor position
//!
//! The cursor's context picks the entry source, first match wins:
//! - inside the string argument of `require`: module names
//! - inside any other string: string literals the called function accepts
//! - inside a comment: nothing
//! - after `.` or `:`: members of the object's type (methods only after `:`)
//! - in a type annotation: builtin type names and aliases
//! - anywhere else: visible locals, globals and keywords

use indexmap::IndexMap;
use luau_ast::visit::{walk_expr, walk_stat, Visitor};
use luau_ast::{Chunk, Expr, ExprKind, Stat, TypeExpr};
use luau_checker::{
    display, ModuleCheck, Primitive, Property, Singleton, TypeGraph, TypeId, TypeKind,
    BUILTIN_TYPE_NAMES,
};

use super::locate::visible_locals;
use super::signature::call_at;
use super::text::{ends_with_word, line_context, line_prefix, LineContext};
use super::{CompletionItem, CompletionKind};

pub const KEYWORDS: &[&str] = &[
    "and", "break", "continue", "do", "else", "elseif", "end", "false", "for", "function", "if",
    "in", "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

const MAX_MEMBER_DEPTH: usize = 8;

/// Completion entries at `offset`, deduplicated and sorted by label.
/// `modules` are the names offered inside `require("...")`.
pub fn autocomplete(check: &ModuleCheck, source: &str, offset: usize, modules: &[String]) -> Vec<CompletionItem> {
    let items = match line_context(source, offset) {
        LineContext::Comment => Vec::new(),
        LineContext::String { start } if is_require_argument(source, start) => modules
            .iter()
            .map(|name| CompletionItem::new(name.clone(), CompletionKind::Module))
            .collect(),
        LineContext::String { .. } => string_items(check, source, offset),
        LineContext::Code => match member_target(&check.chunk, offset) {
            Some((object, is_method)) => member_items(&check.graph, object, is_method),
            None if in_type_position(&check.chunk, source, offset) => type_items(&check.graph),
            None => scope_items(check, offset),
        },
    };
    finish(items)
}

fn finish(items: Vec<CompletionItem>) -> Vec<CompletionItem> {
    let mut unique: IndexMap<String, CompletionItem> = IndexMap::new();
    for item in items {
        unique.entry(item.label.clone()).or_insert(item);
    }
    let mut items: Vec<CompletionItem> = unique.into_values().collect();
    items.sort_by(|a, b| a.label.cmp(&b.label));
    items
}

/// `require("` or `require "` right before the string opened at `start`
fn is_require_argument(source: &str, start: usize) -> bool {
    let head = source[..start].trim_end();
    let head = head.strip_suffix('(').map_or(head, str::trim_end);
    ends_with_word(head, "require")
}

/// Every property reachable by indexing a value of type `ty`
pub(super) fn members_of(graph: &TypeGraph, ty: TypeId) -> IndexMap<String, Property> {
    let mut out = IndexMap::new();
    collect_members(graph, ty, &mut out, 0);
    out
}

fn collect_members(graph: &TypeGraph, ty: TypeId, out: &mut IndexMap<String, Property>, depth: usize) {
    if depth > MAX_MEMBER_DEPTH {
        return;
    }
    let arena = &graph.arena;
    match arena.kind(ty) {
        TypeKind::Table(table) => {
            for (name, prop) in &table.props {
                out.entry(name.clone()).or_insert_with(|| prop.clone());
            }
            let index = table
                .metatable
                .and_then(|mt| arena.as_table(mt))
                .and_then(|mt| mt.props.get("__index"));
            if let Some(index) = index {
                collect_members(graph, index.ty, out, depth + 1);
            }
        }
        TypeKind::Union(parts) | TypeKind::Intersection(parts) => {
            for &part in parts {
                if arena.follow(part) != TypeId::NIL {
                    collect_members(graph, part, out, depth + 1);
                }
            }
        }
        TypeKind::Primitive(Primitive::String) | TypeKind::Singleton(Singleton::String(_)) => {
            if let Some(lib) = graph.global_type("string") {
                collect_members(graph, lib, out, depth + 1);
            }
        }
        _ => {}
    }
}

/// Object of the `a.b` / `a:b` whose member name is under the cursor
fn member_target(chunk: &Chunk, offset: usize) -> Option<(&Expr, bool)> {
    struct Finder<'a> {
        offset: usize,
        found: Option<(&'a Expr, bool)>,
    }

    impl<'ast> Visitor<'ast> for Finder<'ast> {
        fn visit_stat(&mut self, stat: &'ast Stat) {
            if stat.span.contains(self.offset) {
                walk_stat(self, stat);
            }
        }

        fn visit_expr(&mut self, expr: &'ast Expr) {
            if !expr.span.contains(self.offset) {
                return;
            }
            if let ExprKind::IndexName { object, name_span, is_method, .. } = &expr.kind {
                if name_span.contains(self.offset) {
                    self.found = Some((object.as_ref(), *is_method));
                }
            }
            walk_expr(self, expr);
        }
    }

    let mut finder = Finder { offset, found: None };
    finder.visit_block(&chunk.block);
    finder.found
}

fn member_items(graph: &TypeGraph, object: &Expr, is_method: bool) -> Vec<CompletionItem> {
    let Some(ty) = graph.expr_type(object.id) else {
        return Vec::new();
    };
    members_of(graph, ty)
        .into_iter()
        .filter(|(_, prop)| !is_method || graph.arena.is_function(prop.ty))
        .map(|(name, prop)| typed_item(graph, name, prop.ty, CompletionKind::Property).with_deprecated(prop.deprecated))
        .collect()
}

/// An entry for a value; functions get the function kind
fn typed_item(graph: &TypeGraph, label: String, ty: TypeId, kind: CompletionKind) -> CompletionItem {
    let kind = if graph.arena.is_function(ty) {
        CompletionKind::Function
    } else {
        kind
    };
    CompletionItem::new(label, kind).with_detail(display(&graph.arena, ty))
}

/// String singletons accepted by the parameter the cursor's string fills
fn string_items(check: &ModuleCheck, source: &str, offset: usize) -> Vec<CompletionItem> {
    let Some(site) = call_at(check, source, offset) else {
        return Vec::new();
    };
    let index = site.active + usize::from(site.is_method);
    let Some(&param) = site.function.params.head.get(index) else {
        return Vec::new();
    };
    let arena = &check.graph.arena;
    let parts: Vec<TypeId> = match arena.kind(param) {
        TypeKind::Union(parts) => parts.clone(),
        _ => vec![param],
    };
    parts
        .into_iter()
        .filter_map(|part| match arena.kind(part) {
            TypeKind::Singleton(Singleton::String(value)) => {
                Some(CompletionItem::new(value.clone(), CompletionKind::Constant).with_detail(display(arena, part)))
            }
            _ => None,
        })
        .collect()
}

/// Whether the cursor is where a type is written: inside an existing
/// annotation, or right after `local x:`, a parameter's `:`, `->`, `::` or
/// `type T =`
fn in_type_position(chunk: &Chunk, source: &str, offset: usize) -> bool {
    struct Finder {
        offset: usize,
        found: bool,
    }

    impl<'ast> Visitor<'ast> for Finder {
        fn visit_stat(&mut self, stat: &'ast Stat) {
            if stat.span.contains(self.offset) {
                walk_stat(self, stat);
            }
        }

        fn visit_type(&mut self, ty: &'ast TypeExpr) {
            if ty.span.contains(self.offset) {
                self.found = true;
            }
        }
    }

    let mut finder = Finder { offset, found: false };
    finder.visit_block(&chunk.block);
    finder.found || annotation_expected(source, offset)
}

fn annotation_expected(source: &str, offset: usize) -> bool {
    let Some((_, line)) = line_prefix(source, offset) else {
        return false;
    };
    let before = line
        .trim_end_matches(|c: char| c.is_ascii_alphanumeric() || c == '_')
        .trim_end();
    if before.ends_with("->") || before.ends_with("::") {
        return true;
    }
    if let Some(rest) = before.strip_suffix(':') {
        let statement = line.trim_start();
        let plain_local = statement.starts_with("local ") && !statement.starts_with("local function");
        return (plain_local && !rest.contains('=')) || inside_parameter_list(rest);
    }
    if let Some(rest) = before.strip_suffix('=') {
        let statement = rest.trim_start();
        return statement.starts_with("type ") || statement.starts_with("export type ");
    }
    false
}

/// Whether the innermost unclosed `(` of `text` opens a function
/// definition's parameters
fn inside_parameter_list(text: &str) -> bool {
    let mut depth = 0usize;
    for (i, c) in text.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' if depth == 0 => {
                let head = text[..i]
                    .trim_end()
                    .trim_end_matches(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == ':')
                    .trim_end();
                return ends_with_word(head, "function");
            }
            '(' => depth -= 1,
            _ => {}
        }
    }
    false
}

fn type_items(graph: &TypeGraph) -> Vec<CompletionItem> {
    BUILTIN_TYPE_NAMES
        .iter()
        .map(|name| name.to_string())
        .chain(graph.type_aliases.keys().cloned())
        .map(|name| CompletionItem::new(name, CompletionKind::Type))
        .collect()
}

fn scope_items(check: &ModuleCheck, offset: usize) -> Vec<CompletionItem> {
    let graph = &check.graph;
    let mut items = Vec::new();

    for binding in visible_locals(&check.chunk, offset).into_iter().rev() {
        let item = match graph.binding_type(binding.id) {
            Some(ty) => typed_item(graph, binding.name.clone(), ty, CompletionKind::Variable),
            None => CompletionItem::new(binding.name.clone(), CompletionKind::Variable),
        };
        items.push(item);
    }

    for (name, prop) in &graph.globals {
        items.push(typed_item(graph, name.clone(), prop.ty, CompletionKind::Variable).with_deprecated(prop.deprecated));
    }

    items.extend(
        KEYWORDS
            .iter()
            .map(|keyword| CompletionItem::new(*keyword, CompletionKind::Keyword)),
    );
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use luau_checker::{check_for_autocomplete, CheckOptions, NoImports};
    use pretty_assertions::assert_eq;

    fn complete(source: &str) -> Vec<CompletionItem> {
        complete_at(source, source.len())
    }

    fn complete_at(source: &str, offset: usize) -> Vec<CompletionItem> {
        let check = check_for_autocomplete(source, &CheckOptions::default(), &NoImports);
        autocomplete(&check, source, offset, &["util".to_string(), "shapes".to_string()])
    }

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|i| i.label.as_str()).collect()
    }

    fn find<'a>(items: &'a [CompletionItem], label: &str) -> &'a CompletionItem {
        items
            .iter()
            .find(|i| i.label == label)
            .unwrap_or_else(|| panic!("no item '{}' in {:?}", label, labels(items)))
    }

    #[test]
    fn test_members_of_local_table() {
        let items = complete("local t = { count = 1, bump = function() end }\nt.");
        assert_eq!(labels(&items), vec!["bump", "count"]);
        assert_eq!(find(&items, "bump").kind, CompletionKind::Function);
        assert_eq!(find(&items, "count").kind, CompletionKind::Property);
        assert_eq!(find(&items, "count").detail.as_deref(), Some("number"));
    }

    #[test]
    fn test_string_methods() {
        let items = complete("local s = 'abc'\ns:");
        assert!(labels(&items).contains(&"upper"), "{:?}", labels(&items));
        assert!(items.iter().all(|i| i.kind == CompletionKind::Function));
    }

    #[test]
    fn test_deprecated_library_member() {
        let items = complete("table.");
        assert!(find(&items, "getn").deprecated);
        assert!(!find(&items, "insert").deprecated);
    }

    #[test]
    fn test_require_string_lists_modules() {
        let items = complete("local u = require('");
        assert_eq!(labels(&items), vec!["shapes", "util"]);
        assert!(items.iter().all(|i| i.kind == CompletionKind::Module));
    }

    #[test]
    fn test_scope_has_locals_globals_and_keywords() {
        let items = complete("local count = 1\nlocal function go() end\n");
        assert_eq!(find(&items, "count").kind, CompletionKind::Variable);
        assert_eq!(find(&items, "go").kind, CompletionKind::Function);
        assert_eq!(find(&items, "print").kind, CompletionKind::Function);
        assert_eq!(find(&items, "local").kind, CompletionKind::Keyword);
        assert!(find(&items, "getfenv").deprecated);
        let sorted = labels(&items);
        let mut expected = sorted.clone();
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_type_position() {
        let items = complete("type Point = { x: number }\nlocal p: ");
        assert_eq!(find(&items, "Point").kind, CompletionKind::Type);
        assert_eq!(find(&items, "number").kind, CompletionKind::Type);
        assert!(items.iter().all(|i| i.kind == CompletionKind::Type));
    }

    #[test]
    fn test_parameter_annotation_position() {
        let items = complete("local function f(a: ");
        assert!(items.iter().any(|i| i.label == "string"));
        assert!(items.iter().all(|i| i.kind == CompletionKind::Type));
    }

    #[test]
    fn test_comment_is_empty() {
        assert!(complete("local a = 1 -- a").is_empty());
    }

    #[test]
    fn test_string_singleton_argument() {
        let source = "local function pick(kind: \"fast\" | \"slow\") end\npick(\"";
        let items = complete(source);
        assert_eq!(labels(&items), vec!["fast", "slow"]);
        assert!(items.iter().all(|i| i.kind == CompletionKind::Constant));
    }
}
