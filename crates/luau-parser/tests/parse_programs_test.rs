//! Integration tests for parsing complete Luau programs and recovering from
//! syntax errors

use luau_ast::{ExprKind, StatKind};
use luau_parser::parse;
use pretty_assertions::assert_eq;

/// Helper to check that a program parses without errors
fn parse_clean(source: &str) -> luau_ast::Chunk {
    let result = parse(source);
    assert!(
        result.errors.is_empty(),
        "Expected clean parse, got errors: {:?}",
        result.errors
    );
    result.chunk
}

/// Helper returning the rendered error messages
fn error_messages(source: &str) -> Vec<String> {
    parse(source).errors.iter().map(|e| e.to_string()).collect()
}

// === Complete programs ===

#[test]
fn test_class_style_module() {
    parse_clean(
        r#"
--!strict
local Account = {}
Account.__index = Account

export type Account = typeof(setmetatable({} :: { balance: number }, Account))

function Account.new(balance: number): Account
    return setmetatable({ balance = balance }, Account)
end

function Account:deposit(amount: number)
    self.balance += amount
end

function Account:describe(): string
    return if self.balance > 0 then "positive" else "empty"
end

return Account
"#,
    );
}

#[test]
fn test_loops_and_tables() {
    let chunk = parse_clean(
        r#"
local t = { 1, 2, 3, key = "v", ["other"] = 4; }
local total = 0
for i, v in ipairs(t) do
    total = total + v
end
for i = #t, 1, -1 do
    if i % 2 == 0 then continue end
end
while total > 0 do total -= 1 end
repeat local done = true until done
do local scoped = 1 end
"#,
    );
    assert_eq!(chunk.block.stats.len(), 7);
}

#[test]
fn test_generic_functions_and_types() {
    parse_clean(
        r#"
type Map<K, V> = { [K]: V }
type Callback = (err: string?, ...any) -> ()
type Pair<T> = { first: T, second: T } | nil
local function identity<T>(x: T): T
    return x
end
local function varargs(...: number): ...number
    return ...
end
local f: <A>(A) -> (A, A) = function(a) return a, a end
"#,
    );
}

#[test]
fn test_call_sugar() {
    let chunk = parse_clean("print 'hello'\nsetmetatable {} \nlocal s = ('x'):rep(3)");
    assert!(matches!(chunk.block.stats[0].kind, StatKind::Call(_)));
    assert!(matches!(chunk.block.stats[1].kind, StatKind::Call(_)));
}

#[test]
fn test_node_ids_are_unique() {
    let chunk = parse_clean("local a, b = 1, 2\nlocal c = a + b");
    let StatKind::Local { bindings, values } = &chunk.block.stats[1].kind else {
        panic!("Expected local");
    };
    let ExprKind::Binary { left, right, .. } = &values[0].kind else {
        panic!("Expected binary");
    };
    let mut ids = vec![bindings[0].id, values[0].id, left.id, right.id];
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
    assert!(chunk.node_count >= 4);
}

// === Error recovery ===

#[test]
fn test_missing_expression() {
    assert_eq!(
        error_messages("local x ="),
        vec!["Expected identifier when parsing expression, got <eof>".to_string()]
    );
}

#[test]
fn test_unfinished_string() {
    let messages = error_messages("local s = 'abc\nlocal t = 1");
    assert_eq!(messages, vec!["Malformed string; did you forget to finish it?".to_string()]);
}

#[test]
fn test_stray_end_at_top_level() {
    let messages = error_messages("local a = 1\nend\nlocal b = 2");
    assert_eq!(messages, vec!["Expected <eof>, got 'end'".to_string()]);
    assert_eq!(parse("local a = 1\nend\nlocal b = 2").chunk.block.stats.len(), 2);
}

#[test]
fn test_assignment_to_call_is_rejected() {
    assert_eq!(
        error_messages("f() = 1"),
        vec!["Assigned expression must be a variable or a field".to_string()]
    );
}

#[test]
fn test_typing_inside_function_keeps_tree() {
    let result = parse("local t = { name = 'x' }\nlocal function f()\n  t.\nend");
    assert_eq!(result.errors.len(), 1);
    let StatKind::LocalFunction { func, .. } = &result.chunk.block.stats[1].kind else {
        panic!("Expected local function");
    };
    assert_eq!(func.body.stats.len(), 1);
}

// === Nesting limits ===

const TOO_DEEP: &str = "Exceeded allowed recursion depth; simplify your expression to make the code compile";

#[test]
fn test_deep_parentheses_are_rejected() {
    let source = format!("local x = {}1{}\nlocal y = 2", "(".repeat(300), ")".repeat(300));
    let result = parse(&source);
    assert_eq!(error_messages(&source), vec![TOO_DEEP]);
    assert_eq!(result.chunk.block.stats.len(), 1);
}

#[test]
fn test_deep_tables_are_rejected() {
    let source = format!("local t = {}{}", "{".repeat(300), "}".repeat(300));
    assert_eq!(error_messages(&source), vec![TOO_DEEP]);
}

#[test]
fn test_long_member_chain_is_rejected() {
    let source = format!("local v = x{}", ".f".repeat(300));
    assert_eq!(error_messages(&source), vec![TOO_DEEP]);
}

#[test]
fn test_deep_function_types_are_rejected() {
    let source = format!("type F = {}number", "() -> ".repeat(300));
    assert_eq!(error_messages(&source), vec![TOO_DEEP]);
}

#[test]
fn test_moderate_nesting_parses() {
    parse_clean(&format!("local x = {}1{}", "(".repeat(50), ")".repeat(50)));
    parse_clean(&format!("local t = {}{}", "{".repeat(50), "}".repeat(50)));
    parse_clean(&format!("local v = x{}", ".f".repeat(50)));
    parse_clean("local n = 1 + 2 + 3 + 4 + 5 + 6 + 7 + 8 + 9 + 10");
    parse_clean("local o: number?? = nil");
}

#[test]
fn test_grouped_return_types() {
    let chunk = parse_clean(
        "local function find(): (number)?\n    return nil\nend\n\
         local function pick(): (string) | number\n    return 1\nend\n\
         local function pair(): (number, string)\n    return 1, 's'\nend",
    );
    assert_eq!(chunk.block.stats.len(), 3);
}
