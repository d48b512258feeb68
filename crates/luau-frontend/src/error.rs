//! Error types for module resolution and session requests

use thiserror::Error;

/// Why a `require` string did not resolve to a stored module
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("empty module path")]
    EmptyPath,

    /// No stored module matches any variant of the path
    #[error("no module named '{path}'")]
    NotFound { path: String },
}

impl ResolveError {
    /// Error code for machine-readable output
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::EmptyPath => "EmptyPath",
            ResolveError::NotFound { .. } => "UnknownRequire",
        }
    }
}

/// Errors at the request boundary of an analysis session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("unknown module '{0}'")]
    UnknownModule(String),

    /// Checking the module panicked; its previous results are kept
    #[error("internal error while checking '{module}': {message}")]
    Internal { module: String, message: String },

    /// The module is known but has no results yet
    #[error("module '{0}' has not been checked")]
    NotChecked(String),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::UnknownModule(_) => "UnknownModule",
            SessionError::Internal { .. } => "InternalError",
            SessionError::NotChecked(_) => "NotChecked",
        }
    }
}
