//! Helpers shared by the integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use luau_playground::AnalysisSession;

/// A session holding the given modules
pub fn session_with(modules: &[(&str, &str)]) -> AnalysisSession {
    let mut session = AnalysisSession::new();
    for (name, source) in modules {
        session.set_source(name, source);
    }
    session
}

pub fn codes(session: &mut AnalysisSession, name: &str) -> Vec<String> {
    session.diagnostics(name).into_iter().map(|d| d.code).collect()
}

pub fn fixture_dir(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Every `.luau` file under a fixture directory, named relative to it
/// without the extension
pub fn load_fixture(name: &str) -> Vec<(String, String)> {
    let root = fixture_dir(name);
    let mut modules = Vec::new();
    let mut pending = vec![root.clone()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).unwrap_or_else(|e| panic!("cannot read {}: {}", dir.display(), e));
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().and_then(|e| e.to_str()) == Some("luau") {
                let relative = path.strip_prefix(&root).unwrap().with_extension("");
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                modules.push((name, fs::read_to_string(&path).unwrap()));
            }
        }
    }
    modules.sort();
    modules
}
