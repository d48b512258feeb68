//! Resolution of `require` strings to stored module names
//!
//! A reference is normalized, then matched against the table as written,
//! with `.luau` appended, with `.lua` appended, and finally with its own
//! extension swapped for each of those. References starting with `./` are
//! first tried inside the requiring module's directory form (`a` -> `a/`),
//! then beside it, then from the root.

use crate::error::ResolveError;
use crate::source_table::{normalize, SourceTable};

const EXTENSIONS: [&str; 2] = [".luau", ".lua"];

/// Canonical name of the module `reference` points at, as seen from `from`
pub fn resolve(from: &str, reference: &str, table: &SourceTable) -> Result<String, ResolveError> {
    let path = normalize(reference);
    if path.is_empty() {
        return Err(ResolveError::EmptyPath);
    }

    for base in search_bases(from, reference) {
        let candidate = format!("{}{}", base, path);
        if let Some(found) = find_variant(&candidate, table) {
            tracing::trace!(from, reference, resolved = %found, "resolved require");
            return Ok(found);
        }
    }

    Err(ResolveError::NotFound {
        path: reference.to_string(),
    })
}

/// Directory prefixes to try, most specific first
fn search_bases(from: &str, reference: &str) -> Vec<String> {
    let mut bases = Vec::new();
    if reference.starts_with("./") {
        let from = normalize(from);
        bases.push(format!("{}/", strip_extension(from)));
        if let Some(slash) = from.rfind('/') {
            bases.push(from[..=slash].to_string());
        }
    }
    bases.push(String::new());
    bases.dedup();
    bases
}

fn strip_extension(name: &str) -> &str {
    EXTENSIONS
        .iter()
        .find_map(|ext| name.strip_suffix(ext))
        .unwrap_or(name)
}

fn find_variant(path: &str, table: &SourceTable) -> Option<String> {
    if let Some(found) = find_exact_or_extended(path, table) {
        return Some(found);
    }
    let file_start = path.rfind('/').map_or(0, |slash| slash + 1);
    let dot = file_start + path[file_start..].rfind('.')?;
    find_exact_or_extended(&path[..dot], table)
}

fn find_exact_or_extended(path: &str, table: &SourceTable) -> Option<String> {
    if table.contains_key(path) {
        return Some(path.to_string());
    }
    EXTENSIONS
        .iter()
        .map(|ext| format!("{}{}", path, ext))
        .find(|candidate| table.contains_key(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(names: &[&str]) -> SourceTable {
        let mut table = SourceTable::new();
        for name in names {
            table.set_source(name, "return {}");
        }
        table
    }

    #[test]
    fn test_exact_and_extensions() {
        let table = table(&["util", "shapes.luau", "legacy.lua"]);
        assert_eq!(resolve("main", "util", &table), Ok("util".to_string()));
        assert_eq!(resolve("main", "shapes", &table), Ok("shapes.luau".to_string()));
        assert_eq!(resolve("main", "legacy", &table), Ok("legacy.lua".to_string()));
        assert_eq!(resolve("main", "/util", &table), Ok("util".to_string()));
    }

    #[test]
    fn test_extension_swap() {
        let table = table(&["shapes.luau"]);
        assert_eq!(resolve("main", "shapes.lua", &table), Ok("shapes.luau".to_string()));
        let table = self::table(&["util"]);
        assert_eq!(resolve("main", "./util.luau", &table), Ok("util".to_string()));
    }

    #[test]
    fn test_relative_to_module_directory() {
        let table = table(&["a", "a/b.luau", "b"]);
        assert_eq!(resolve("a", "./b", &table), Ok("a/b.luau".to_string()));
        assert_eq!(resolve("main", "./b", &table), Ok("b".to_string()));
        assert_eq!(resolve("a", "b", &table), Ok("b".to_string()));
    }

    #[test]
    fn test_relative_to_sibling() {
        let table = table(&["lib/init.luau", "lib/math.luau"]);
        assert_eq!(
            resolve("lib/init.luau", "./math", &table),
            Ok("lib/math.luau".to_string())
        );
    }

    #[test]
    fn test_dotted_module_names() {
        let table = table(&["pkg.core", "pkg", "x"]);
        assert_eq!(resolve("pkg.core", "./x", &table), Ok("x".to_string()));
        assert_eq!(resolve("main", "pkg.core", &table), Ok("pkg.core".to_string()));
        assert_eq!(resolve("main", "pkg.luau", &table), Ok("pkg".to_string()));
    }

    #[test]
    fn test_dotted_directories() {
        let table = table(&["lib.v2/init", "lib.v2/helper.luau", "lib"]);
        assert_eq!(
            resolve("lib.v2/init", "./helper", &table),
            Ok("lib.v2/helper.luau".to_string())
        );
        let table = self::table(&["lib.v2/init", "lib"]);
        assert_eq!(
            resolve("lib.v2/init", "./helper", &table),
            Err(ResolveError::NotFound {
                path: "./helper".to_string()
            })
        );
    }

    #[test]
    fn test_unresolved() {
        let table = table(&["util"]);
        assert_eq!(
            resolve("main", "./missing", &table),
            Err(ResolveError::NotFound {
                path: "./missing".to_string()
            })
        );
        assert_eq!(resolve("main", "./", &table), Err(ResolveError::EmptyPath));
    }
}
