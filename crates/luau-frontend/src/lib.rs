//! luau-frontend: incremental analysis over a set of named modules
//!
//! This crate owns everything above single-module checking:
//! - The source table of named buffers with per-module dirty flags
//! - Resolution of `require` strings to stored modules
//! - Dependency-ordered planning of which modules need re-checking
//! - The analysis session and its editor queries (diagnostics,
//!   autocomplete, hover, signature help)
//! - The JSON request/response protocol spoken by hosts
//!
//! # Example
//!
//! ```ignore
//! use luau_frontend::AnalysisSession;
//! use luau_checker::Mode;
//!
//! let mut session = AnalysisSession::new();
//! session.set_mode(Mode::Strict);
//! session.set_source("util", "return { f = function() end }");
//! session.set_source("main", "local u = require('util')\nu.f()");
//! assert!(session.diagnostics("main").is_empty());
//! ```

mod config;
mod error;
mod orderer;
mod resolver;
mod session;
mod source_table;

pub mod protocol;
pub mod query;

pub use config::ConfigState;
pub use error::{ResolveError, SessionError};
pub use orderer::{plan_check, DependencyStamp, DependencyTarget, Plan};
pub use resolver::resolve;
pub use session::{AnalysisSession, VERSION};
pub use source_table::{normalize, CheckedModule, Module, SourceTable};

pub use query::{CompletionItem, CompletionKind, SignatureHelp};
