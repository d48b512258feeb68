//! The per-module result of type inference and the view of other modules'
//! results that inference needs

use indexmap::IndexMap;
use luau_ast::NodeId;
use rustc_hash::FxHashMap;

use crate::scope::AliasDef;
use crate::types::{Property, TypeArena, TypeId, TypePack};

/// Every type inferred for one module
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    pub arena: TypeArena,
    /// Type of each expression node
    pub expr_types: FxHashMap<NodeId, TypeId>,
    /// Type of each local binding
    pub binding_types: FxHashMap<NodeId, TypeId>,
    /// Return pack of each call expression
    pub call_types: FxHashMap<NodeId, TypePack>,
    pub globals: IndexMap<String, Property>,
    /// Type of the module's return value; `None` unless exactly one value
    /// is returned
    pub module_type: Option<TypeId>,
    pub exported_types: IndexMap<String, AliasDef>,
    /// Every alias declared anywhere in the module, by name
    pub type_aliases: IndexMap<String, TypeId>,
    /// Inference ran on a tree recovered from syntax errors
    pub parse_failed: bool,
}

impl TypeGraph {
    pub fn expr_type(&self, id: NodeId) -> Option<TypeId> {
        self.expr_types.get(&id).map(|&t| self.arena.follow(t))
    }

    pub fn binding_type(&self, id: NodeId) -> Option<TypeId> {
        self.binding_types.get(&id).map(|&t| self.arena.follow(t))
    }

    pub fn global_type(&self, name: &str) -> Option<TypeId> {
        self.globals.get(name).map(|p| self.arena.follow(p.ty))
    }
}

/// What a `require` call resolved to
#[derive(Debug, Clone, Copy)]
pub enum ModuleImport<'a> {
    /// A checked module; `name` is its display name
    Resolved { name: &'a str, graph: &'a TypeGraph },
    /// No module matched the path
    Unresolved,
    /// Requiring this module closes a cycle, described as `a -> b -> a`
    Cyclic(&'a str),
    /// The module exists but could not be checked
    Unavailable,
}

/// Lookup of required modules by the path string written in `require`
pub trait ModuleImports {
    fn import(&self, path: &str) -> ModuleImport<'_>;
}

/// For checking a module on its own
pub struct NoImports;

impl ModuleImports for NoImports {
    fn import(&self, _path: &str) -> ModuleImport<'_> {
        ModuleImport::Unresolved
    }
}

