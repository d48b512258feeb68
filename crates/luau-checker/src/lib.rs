//! Luau Type Checker
//!
//! Type inference, linting and diagnostics for one module at a time. Other
//! modules are visible only through the `ModuleImports` view the caller
//! passes in, so this crate knows nothing about files or sessions.

mod types;
mod display;
mod error;
mod options;
mod unify;
mod instantiate;
mod scope;
mod ctx;

pub mod builtins;
pub mod diagnostics;
pub mod engine;
pub mod graph;
pub mod lint;
pub mod requires;
pub mod solver;

pub use types::*;
pub use display::{display, display_pack};
pub use error::*;
pub use options::*;
pub use ctx::SolveConfig;
pub use unify::Unifier;
pub use instantiate::{instantiate, TypeImporter};
pub use scope::{AliasDef, BUILTIN_TYPE_NAMES};

pub use diagnostics::{sort_diagnostics, Diagnostic, Severity};
pub use engine::{check_for_autocomplete, check_module, effective_mode, ModuleCheck};
pub use graph::{ModuleImport, ModuleImports, NoImports, TypeGraph};
pub use lint::LintWarning;
pub use requires::{find_requires, require_path, RequireRef};
pub use solver::{solver_for, NewSolver, OldSolver, Solver};
