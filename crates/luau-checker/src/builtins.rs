//! Types of the standard globals and libraries
//!
//! Definitions are written as Luau type annotations and parsed once; every
//! check installs fresh copies into its own arena.

use indexmap::IndexMap;
use luau_ast::TypeExpr;
use once_cell::sync::Lazy;

use crate::scope::{ResolveTypes, StandaloneResolver};
use crate::types::*;

const GLOBAL_FUNCTIONS: &[(&str, &str)] = &[
    ("print", "(...any) -> ()"),
    ("type", "(value: any) -> string"),
    ("typeof", "(value: any) -> string"),
    ("tostring", "(value: any) -> string"),
    ("tonumber", "(value: any, radix: number?) -> number?"),
    ("pairs", "<K, V>(t: {[K]: V}) -> (({[K]: V}, K?) -> (K, V), {[K]: V}, nil)"),
    ("ipairs", "<V>(t: {V}) -> (({V}, number) -> (number, V), {V}, number)"),
    ("next", "<K, V>(t: {[K]: V}, index: K?) -> (K?, V)"),
    ("select", "(index: any, ...any) -> ...any"),
    ("error", "(message: any, level: number?) -> never"),
    ("assert", "<T>(value: T, message: string?) -> T"),
    ("pcall", "(f: any, ...any) -> (boolean, ...any)"),
    ("xpcall", "(f: any, handler: any, ...any) -> (boolean, ...any)"),
    ("setmetatable", "<T>(t: T, mt: any) -> T"),
    ("getmetatable", "(value: any) -> any"),
    ("rawget", "(t: any, key: any) -> any"),
    ("rawset", "<T>(t: T, key: any, value: any) -> T"),
    ("rawequal", "(a: any, b: any) -> boolean"),
    ("rawlen", "(value: any) -> number"),
    ("unpack", "<V>(list: {V}, i: number?, j: number?) -> ...V"),
    ("require", "(path: any) -> any"),
    ("newproxy", "(mt: boolean?) -> any"),
    ("gcinfo", "() -> number"),
    ("getfenv", "(target: any?) -> any"),
    ("setfenv", "(target: any, env: any) -> any"),
];

const LIBRARIES: &[(&str, &[(&str, &str)])] = &[
    (
        "math",
        &[
            ("pi", "number"),
            ("huge", "number"),
            ("abs", "(n: number) -> number"),
            ("ceil", "(n: number) -> number"),
            ("floor", "(n: number) -> number"),
            ("round", "(n: number) -> number"),
            ("sqrt", "(n: number) -> number"),
            ("exp", "(n: number) -> number"),
            ("log", "(n: number, base: number?) -> number"),
            ("sin", "(n: number) -> number"),
            ("cos", "(n: number) -> number"),
            ("tan", "(n: number) -> number"),
            ("fmod", "(x: number, y: number) -> number"),
            ("max", "(n: number, ...number) -> number"),
            ("min", "(n: number, ...number) -> number"),
            ("clamp", "(n: number, min: number, max: number) -> number"),
            ("sign", "(n: number) -> number"),
            ("random", "(m: number?, n: number?) -> number"),
            ("randomseed", "(seed: number) -> ()"),
            ("noise", "(x: number, y: number?, z: number?) -> number"),
        ],
    ),
    (
        "string",
        &[
            ("len", "(s: string) -> number"),
            ("sub", "(s: string, i: number, j: number?) -> string"),
            ("upper", "(s: string) -> string"),
            ("lower", "(s: string) -> string"),
            ("rep", "(s: string, n: number) -> string"),
            ("reverse", "(s: string) -> string"),
            ("byte", "(s: string, i: number?, j: number?) -> ...number"),
            ("char", "(...number) -> string"),
            ("format", "(format: string, ...any) -> string"),
            ("find", "(s: string, pattern: string, init: number?, plain: boolean?) -> (number?, number?)"),
            ("match", "(s: string, pattern: string, init: number?) -> ...string"),
            ("gmatch", "(s: string, pattern: string) -> () -> ...string"),
            ("gsub", "(s: string, pattern: string, repl: any, n: number?) -> (string, number)"),
            ("split", "(s: string, separator: string?) -> {string}"),
        ],
    ),
    (
        "table",
        &[
            ("insert", "<V>(t: {V}, ...any) -> ()"),
            ("remove", "<V>(t: {V}, pos: number?) -> V?"),
            ("concat", "(t: {any}, sep: string?, i: number?, j: number?) -> string"),
            ("sort", "<V>(t: {V}, comp: ((V, V) -> boolean)?) -> ()"),
            ("unpack", "<V>(list: {V}, i: number?, j: number?) -> ...V"),
            ("pack", "(...any) -> { n: number, [number]: any }"),
            ("find", "<V>(t: {V}, value: V, init: number?) -> number?"),
            ("clear", "(t: any) -> ()"),
            ("clone", "<T>(t: T) -> T"),
            ("freeze", "<T>(t: T) -> T"),
            ("isfrozen", "(t: any) -> boolean"),
            ("create", "<V>(count: number, value: V?) -> {V}"),
            ("move", "<V>(a1: {V}, f: number, e: number, t: number, a2: {V}?) -> {V}"),
            ("maxn", "(t: any) -> number"),
            ("getn", "(t: any) -> number"),
            ("foreach", "(t: any, f: any) -> ()"),
            ("foreachi", "(t: any, f: any) -> ()"),
        ],
    ),
    (
        "os",
        &[
            ("time", "(t: any?) -> number"),
            ("clock", "() -> number"),
            ("date", "(format: string?, time: number?) -> any"),
            ("difftime", "(t2: number, t1: number?) -> number"),
        ],
    ),
    (
        "coroutine",
        &[
            ("create", "(f: any) -> thread"),
            ("resume", "(co: thread, ...any) -> (boolean, ...any)"),
            ("yield", "(...any) -> ...any"),
            ("status", "(co: thread) -> string"),
            ("wrap", "(f: any) -> any"),
            ("running", "() -> thread"),
            ("isyieldable", "() -> boolean"),
            ("close", "(co: thread) -> (boolean, any)"),
        ],
    ),
    (
        "bit32",
        &[
            ("band", "(...number) -> number"),
            ("bor", "(...number) -> number"),
            ("bxor", "(...number) -> number"),
            ("bnot", "(n: number) -> number"),
            ("btest", "(...number) -> boolean"),
            ("lshift", "(n: number, i: number) -> number"),
            ("rshift", "(n: number, i: number) -> number"),
            ("arshift", "(n: number, i: number) -> number"),
            ("extract", "(n: number, field: number, width: number?) -> number"),
            ("replace", "(n: number, v: number, field: number, width: number?) -> number"),
        ],
    ),
    (
        "utf8",
        &[
            ("char", "(...number) -> string"),
            ("charpattern", "string"),
            ("codepoint", "(s: string, i: number?, j: number?) -> ...number"),
            ("len", "(s: string, i: number?, j: number?) -> number?"),
            ("offset", "(s: string, n: number?, i: number?) -> number"),
            ("codes", "(s: string) -> ((string, number) -> (number, number), string, number)"),
        ],
    ),
];

/// Globals and library members that still type check but are flagged
const DEPRECATED: &[&str] = &["getfenv", "setfenv", "table.getn", "table.foreach", "table.foreachi"];

/// Every deprecated global (`getfenv`) and library member (`table.getn`)
pub fn deprecated_names() -> &'static [&'static str] {
    DEPRECATED
}

pub fn is_deprecated(path: &str) -> bool {
    DEPRECATED.contains(&path)
}

enum Definition {
    Value(&'static str, TypeExpr),
    Library(&'static str, Vec<(&'static str, TypeExpr)>),
}

static DEFINITIONS: Lazy<Vec<Definition>> = Lazy::new(|| {
    let mut defs = Vec::new();
    for (name, source) in GLOBAL_FUNCTIONS {
        if let Some(ty) = parse_definition(name, source) {
            defs.push(Definition::Value(name, ty));
        }
    }
    for (library, members) in LIBRARIES {
        let members = members
            .iter()
            .filter_map(|(member, source)| Some((*member, parse_definition(member, source)?)))
            .collect();
        defs.push(Definition::Library(library, members));
    }
    defs
});

fn parse_definition(name: &str, source: &str) -> Option<TypeExpr> {
    match luau_parser::parse_type(source) {
        Ok(ty) => Some(ty),
        Err(err) => {
            tracing::error!(name, %err, "invalid builtin definition");
            None
        }
    }
}

/// The builtin environment installed into one arena
#[derive(Debug, Clone)]
pub struct Builtins {
    pub globals: IndexMap<String, Property>,
    /// The `string` library, used for method calls on strings
    pub string_lib: TypeId,
}

impl Builtins {
    pub fn install(arena: &mut TypeArena) -> Self {
        let mut resolver = StandaloneResolver::new(arena);
        let mut globals = IndexMap::new();
        let mut string_lib = TypeId::ANY;

        for def in DEFINITIONS.iter() {
            match def {
                Definition::Value(name, ty) => {
                    let ty = resolver.resolve_annotation(ty);
                    let mut prop = Property::new(ty);
                    prop.deprecated = is_deprecated(name);
                    globals.insert(name.to_string(), prop);
                }
                Definition::Library(library, members) => {
                    let mut table = TableType::new(TableState::Sealed);
                    table.name = Some(library.to_string());
                    for (member, ty) in members {
                        let ty = resolver.resolve_annotation(ty);
                        let mut prop = Property::new(ty);
                        prop.deprecated = is_deprecated(&format!("{}.{}", library, member));
                        table.props.insert(member.to_string(), prop);
                    }
                    let ty = resolver.arena.table(table);
                    if *library == "string" {
                        string_lib = ty;
                    }
                    globals.insert(library.to_string(), Property::new(ty));
                }
            }
        }

        if !resolver.errors.is_empty() {
            tracing::error!(count = resolver.errors.len(), "builtin definitions failed to resolve");
        }

        globals.insert("_G".to_string(), Property::new(TypeId::ANY));
        globals.insert("_VERSION".to_string(), Property::new(TypeId::STRING));

        Self { globals, string_lib }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::display;

    #[test]
    fn test_all_definitions_parse() {
        let parsed: usize = DEFINITIONS
            .iter()
            .map(|d| match d {
                Definition::Value(..) => 1,
                Definition::Library(_, members) => members.len(),
            })
            .sum();
        let written: usize =
            GLOBAL_FUNCTIONS.len() + LIBRARIES.iter().map(|(_, m)| m.len()).sum::<usize>();
        assert_eq!(parsed, written);
    }

    #[test]
    fn test_install_globals() {
        let mut arena = TypeArena::new();
        let builtins = Builtins::install(&mut arena);
        let print = builtins.globals["print"].ty;
        assert_eq!(display(&arena, print), "(...any) -> ()");
        let math = builtins.globals["math"].ty;
        let floor = arena.as_table(math).map(|t| t.props["floor"].ty).unwrap();
        assert_eq!(display(&arena, floor), "(n: number) -> number");
        assert!(builtins.globals["getfenv"].deprecated);
    }

    #[test]
    fn test_deprecated_members() {
        let mut arena = TypeArena::new();
        let builtins = Builtins::install(&mut arena);
        let table = builtins.globals["table"].ty;
        let lib = arena.as_table(table).unwrap();
        assert!(lib.props["getn"].deprecated);
        assert!(!lib.props["insert"].deprecated);
        assert!(is_deprecated("table.foreach"));
    }
}
