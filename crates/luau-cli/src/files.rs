//! Gathering source files and naming them as modules
//!
//! A module's name is its path relative to the deepest directory that holds
//! every input, with `/` separators and the extension kept, e.g.
//! `lib/strings.luau`. Requires resolve with or without the extension.

use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::LoadError;

const EXTENSIONS: [&str; 2] = ["luau", "lua"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub path: PathBuf,
    pub text: String,
}

fn is_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext))
}

/// Files named on the command line are taken as is; directories are walked
/// for `.luau` and `.lua` files
pub fn collect(paths: &[PathBuf]) -> Result<Vec<SourceFile>, LoadError> {
    let mut found = Vec::new();
    let mut bases = Vec::new();
    for path in paths {
        if path.is_dir() {
            bases.push(path.clone());
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_file() && is_source(entry.path()) {
                    found.push(entry.into_path());
                }
            }
        } else {
            bases.push(path.parent().map(Path::to_path_buf).unwrap_or_default());
            found.push(path.clone());
        }
    }
    if found.is_empty() {
        return Err(LoadError::NoFiles);
    }

    let root = common_root(&bases);
    let mut files = Vec::with_capacity(found.len());
    for path in found {
        let text = fs::read_to_string(&path).map_err(|source| LoadError::Read {
            path: path.clone(),
            source,
        })?;
        let name = module_name(&root, &path);
        tracing::debug!(module = %name, path = %path.display(), "loaded source");
        files.push(SourceFile { name, path, text });
    }
    files.dedup_by(|a, b| a.path == b.path);
    Ok(files)
}

/// Longest shared leading path of `dirs`
fn common_root(dirs: &[PathBuf]) -> PathBuf {
    let mut iter = dirs.iter();
    let Some(first) = iter.next() else {
        return PathBuf::new();
    };
    let mut root: Vec<Component<'_>> = first.components().collect();
    for dir in iter {
        let shared = root
            .iter()
            .zip(dir.components())
            .take_while(|(a, b)| **a == *b)
            .count();
        root.truncate(shared);
    }
    root.iter().collect()
}

fn module_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
