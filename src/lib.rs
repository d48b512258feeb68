//! Luau playground analysis
//!
//! This root crate ties the workspace together and hosts the cross-crate
//! integration tests. The analysis itself lives in the member crates:
//!
//! - `luau-ast`, `luau-lexer`, `luau-parser`: syntax
//! - `luau-checker`: type inference, lints and diagnostics for one module
//! - `luau-frontend`: the multi-module session and editor queries
//! - `luau-cli`: the `luau-analyze` binary

pub use luau_ast as ast;
pub use luau_checker as checker;
pub use luau_frontend as frontend;
pub use luau_parser as parser;

pub use luau_frontend::AnalysisSession;
