use luau_checker::{display, display_pack, FunctionType, ModuleCheck, TypeId};

use super::autocomplete::{members_of, KEYWORDS};
use super::locate::visible_locals;
use super::text::{ends_with_word, innermost_paren, is_ident_char};
use super::SignatureHelp;

/// A call being written at the cursor
pub(super) struct CallSite<'a> {
    /// Callee as written, e.g. `string.format` or `obj:method`
    pub name: &'a str,
    pub function: &'a FunctionType,
    /// Index of the argument under the cursor
    pub active: usize,
    pub is_method: bool,
}

/// Innermost call whose argument list contains `offset`, with a callee that
/// is a name path typed as a function
pub(super) fn call_at<'a>(check: &'a ModuleCheck, source: &'a str, offset: usize) -> Option<CallSite<'a>> {
    let (open, commas) = innermost_paren(source, offset)?;
    let name = callee_before(source, open)?;
    let ty = resolve_path(check, name, offset)?;
    let function = check.graph.arena.as_function(ty)?;
    Some(CallSite {
        name,
        function,
        active: commas,
        is_method: name.contains(':'),
    })
}

/// The dotted name right before a `(`, unless the parenthesis opens a
/// function definition's parameter list or follows a keyword
fn callee_before(source: &str, open: usize) -> Option<&str> {
    let head = source.get(..open)?.trim_end();
    let start = head
        .trim_end_matches(|c: char| is_ident_char(c) || c == '.' || c == ':')
        .len();
    let name = &head[start..];
    let first = name.chars().next()?;
    if !(first.is_ascii_alphabetic() || first == '_') || KEYWORDS.contains(&name) {
        return None;
    }
    if ends_with_word(head[..start].trim_end(), "function") {
        return None;
    }
    Some(name)
}

/// Type of a `a.b:c` path: the first segment is a visible local or a
/// global, the rest are members
fn resolve_path(check: &ModuleCheck, path: &str, offset: usize) -> Option<TypeId> {
    let graph = &check.graph;
    let mut segments = path.split(['.', ':']);
    let first = segments.next()?;
    let mut ty = visible_locals(&check.chunk, offset)
        .iter()
        .rev()
        .find(|binding| binding.name == first)
        .and_then(|binding| graph.binding_type(binding.id))
        .or_else(|| graph.global_type(first))?;
    for segment in segments {
        ty = members_of(graph, ty).get(segment)?.ty;
    }
    Some(graph.arena.follow(ty))
}

/// Signature of the call around `offset`. Method calls leave out `self`.
pub fn signature_help(check: &ModuleCheck, source: &str, offset: usize) -> Option<SignatureHelp> {
    let site = call_at(check, source, offset)?;
    let arena = &check.graph.arena;
    let function = site.function;
    let skip = usize::from(site.is_method && !function.params.head.is_empty());

    let mut parameters: Vec<String> = function
        .params
        .head
        .iter()
        .enumerate()
        .skip(skip)
        .map(|(i, &ty)| match function.param_names.get(i).and_then(|n| n.as_deref()) {
            Some(name) => format!("{}: {}", name, display(arena, ty)),
            None => display(arena, ty),
        })
        .collect();
    if let Some(tail) = function.params.tail {
        parameters.push(format!("...{}", display(arena, tail)));
    }

    let label = format!(
        "{}({}) -> {}",
        site.name,
        parameters.join(", "),
        display_pack(arena, &function.returns)
    );
    let active_parameter = site.active.min(parameters.len().saturating_sub(1));
    Some(SignatureHelp {
        label,
        parameters,
        active_parameter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use luau_checker::{check_for_autocomplete, CheckOptions, NoImports};
    use pretty_assertions::assert_eq;

    fn help(source: &str) -> Option<SignatureHelp> {
        let check = check_for_autocomplete(source, &CheckOptions::default(), &NoImports);
        signature_help(&check, source, source.len())
    }

    #[test]
    fn test_local_function() {
        let source = "local function add(a: number, b: number): number return a + b end\nadd(1, ";
        assert_eq!(
            help(source),
            Some(SignatureHelp {
                label: "add(a: number, b: number) -> number".to_string(),
                parameters: vec!["a: number".to_string(), "b: number".to_string()],
                active_parameter: 1,
            })
        );
    }

    #[test]
    fn test_method_skips_self() {
        let source = "local T = {}\nfunction T:scale(k: number) return k end\nT:scale(";
        let help = help(source).expect("signature");
        assert_eq!(help.parameters, vec!["k: number".to_string()]);
        assert_eq!(help.active_parameter, 0);
    }

    #[test]
    fn test_definition_is_not_a_call() {
        assert_eq!(help("local function f(a, "), None);
        assert_eq!(help("if ("), None);
    }

    #[test]
    fn test_library_member() {
        let help = help("local s = string.rep(").expect("signature");
        assert!(help.label.starts_with("string.rep("), "{}", help.label);
        assert_eq!(help.active_parameter, 0);
    }
}
