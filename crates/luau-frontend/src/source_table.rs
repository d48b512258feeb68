//! Named source buffers and their cached check results

use indexmap::IndexMap;
use luau_checker::ModuleCheck;

use crate::orderer::DependencyStamp;

/// Canonical form of a module name: leading `./` and `/` removed
pub fn normalize(name: &str) -> &str {
    let mut name = name;
    while let Some(rest) = name.strip_prefix("./") {
        name = rest;
    }
    name.trim_start_matches('/')
}

/// Diagnostics-mode results of a module plus what they were computed from
#[derive(Debug, Clone)]
pub struct CheckedModule {
    pub check: ModuleCheck,
    /// Resolution of every `require` at the time of the check
    pub dependencies: Vec<DependencyStamp>,
}

/// One stored module
#[derive(Debug, Clone)]
pub struct Module {
    /// Name as the caller last wrote it
    pub name: String,
    pub source: String,
    pub dirty: bool,
    /// Bumped on every successful check
    pub generation: u64,
    pub checked: Option<CheckedModule>,
    /// Strict, syntax-tolerant results used by editor queries
    pub autocomplete: Option<ModuleCheck>,
    /// Message of the last check attempt that panicked
    pub failure: Option<String>,
}

impl Module {
    fn new(name: &str, source: &str) -> Self {
        Self {
            name: name.to_string(),
            source: source.to_string(),
            dirty: true,
            generation: 0,
            checked: None,
            autocomplete: None,
            failure: None,
        }
    }

    pub fn check(&self) -> Option<&ModuleCheck> {
        self.checked.as_ref().map(|c| &c.check)
    }
}

/// Every module of a session, keyed by canonical name in insertion order
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    modules: IndexMap<String, Module>,
}

impl SourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a module and mark it dirty. Dependents are left
    /// alone; planning notices them through their dependency stamps.
    pub fn set_source(&mut self, name: &str, source: &str) {
        let key = normalize(name);
        match self.modules.get_mut(key) {
            Some(module) => {
                module.name = name.to_string();
                module.source = source.to_string();
                module.dirty = true;
            }
            None => {
                self.modules.insert(key.to_string(), Module::new(name, source));
            }
        }
        tracing::debug!(module = key, bytes = source.len(), "source updated");
    }

    pub fn get_source(&self, name: &str) -> Option<&str> {
        self.get(name).map(|m| m.source.as_str())
    }

    /// Look up a module by any spelling of its name
    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.get(normalize(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.modules.get_mut(normalize(name))
    }

    /// Exact lookup of a canonical key
    pub fn contains_key(&self, key: &str) -> bool {
        self.modules.contains_key(key)
    }

    /// Insertion rank of a canonical key
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.modules.get_index_of(key)
    }

    pub fn mark_all_dirty(&mut self) {
        for module in self.modules.values_mut() {
            module.dirty = true;
        }
    }

    pub fn reset(&mut self) {
        self.modules.clear();
    }

    /// Canonical keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Module)> {
        self.modules.iter().map(|(k, m)| (k.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
